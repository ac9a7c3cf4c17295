use fxhash::hash64;

/// Deterministic offline vector used when the embedder runs in `"stub"` mode.
/// Sinusoid values seeded from a hash of the input text: reproducible,
/// text-sensitive, and cheap. Not semantically meaningful.
pub(crate) fn make_stub_vector(text: &str, dimension: usize) -> Vec<f32> {
    let h = hash64(text.as_bytes());
    let mut v = vec![0f32; dimension];
    for (idx, value) in v.iter_mut().enumerate() {
        *value = ((h.rotate_right((idx % 64) as u32) as f32) * 0.0001).sin();
    }
    v
}
