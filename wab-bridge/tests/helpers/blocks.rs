//! Interleaved stereo block generation

/// Little-endian byte image of `samples`, as the producer's memory holds them
pub fn interleaved_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// `frames` stereo frames: left counts up from `base`, right is its negation
pub fn ramp_block(frames: usize, base: f32) -> Vec<f32> {
    (0..frames)
        .flat_map(|i| {
            let value = base + i as f32 * 0.01;
            [value, -value]
        })
        .collect()
}

/// Write `samples` into `memory` at byte `offset`
pub fn write_block(memory: &mut [u8], offset: usize, samples: &[f32]) {
    let bytes = interleaved_bytes(samples);
    memory[offset..offset + bytes.len()].copy_from_slice(&bytes);
}
