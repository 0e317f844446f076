//! xtask pack-audio — lay a PCM file into a raw SD card image.
//!
//! The card is unpartitioned. The firmware streams
//! `TOTAL_MUSIC_BLOCKS` blocks starting at `MUSIC_START_BLOCK` and plays only
//! the first `RING_CAPACITY` bytes of each one, so the packer spreads the
//! input 400 bytes per block and fills the unused tail of every block with
//! silence. Short inputs are padded with silence; long ones are truncated.
//!
//! Write the image with e.g. `dd if=card.img of=/dev/sdX bs=512`.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use platform::config::{MUSIC_START_BLOCK, RING_CAPACITY, SILENCE_SAMPLE, TOTAL_MUSIC_BLOCKS};
use platform::BLOCK_SIZE;

/// Samples the firmware plays before looping.
#[allow(clippy::arithmetic_side_effects)] // 484 * 400
pub(crate) const PLAYABLE_SAMPLES: usize = TOTAL_MUSIC_BLOCKS as usize * RING_CAPACITY;

/// Zeroed bytes ahead of the asset.
#[allow(clippy::arithmetic_side_effects)] // 100 * 512
const RESERVED_BYTES: usize = MUSIC_START_BLOCK as usize * BLOCK_SIZE;

/// Entry point called from main.rs
pub fn run(input: &Path, output: &Path) -> Result<()> {
    let pcm = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if pcm.len() > PLAYABLE_SAMPLES {
        println!(
            "{}",
            format!(
                "⚠ Input has {} samples; only the first {} are played",
                pcm.len(),
                PLAYABLE_SAMPLES
            )
            .yellow()
        );
    }

    let image = pack(&pcm);
    std::fs::write(output, &image)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{}",
        format!(
            "✓ Wrote {} ({} bytes, {} blocks of audio at block {})",
            output.display(),
            image.len(),
            TOTAL_MUSIC_BLOCKS,
            MUSIC_START_BLOCK
        )
        .green()
    );
    Ok(())
}

/// Build the card image for `pcm`.
pub(crate) fn pack(pcm: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; RESERVED_BYTES];
    let mut chunks = pcm.chunks(RING_CAPACITY);

    for _ in 0..TOTAL_MUSIC_BLOCKS {
        let mut block = [SILENCE_SAMPLE; BLOCK_SIZE];
        if let Some(chunk) = chunks.next() {
            if let Some(payload) = block.get_mut(..chunk.len()) {
                payload.copy_from_slice(chunk);
            }
        }
        image.extend_from_slice(&block);
    }
    image
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn block(image: &[u8], n: usize) -> &[u8] {
        &image[n * BLOCK_SIZE..(n + 1) * BLOCK_SIZE]
    }

    #[test]
    fn test_image_covers_reserved_area_and_asset() {
        let image = pack(&[]);
        assert_eq!(image.len(), (100 + 484) * 512);
        assert!(block(&image, 99).iter().all(|&b| b == 0));
        assert!(block(&image, 100).iter().all(|&b| b == SILENCE_SAMPLE));
    }

    #[test]
    fn test_400_payload_bytes_per_block() {
        let pcm: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let image = pack(&pcm);

        assert_eq!(&block(&image, 100)[..400], &pcm[..400]);
        assert!(block(&image, 100)[400..].iter().all(|&b| b == SILENCE_SAMPLE));
        assert_eq!(&block(&image, 101)[..400], &pcm[400..800]);
        assert_eq!(&block(&image, 102)[..200], &pcm[800..]);
        assert!(block(&image, 102)[200..].iter().all(|&b| b == SILENCE_SAMPLE));
    }

    #[test]
    fn test_long_input_is_truncated_to_the_loop() {
        let pcm = vec![0x11; PLAYABLE_SAMPLES + 4000];
        let image = pack(&pcm);
        assert_eq!(image.len(), (100 + 484) * 512);
        assert_eq!(block(&image, 583)[399], 0x11);
    }

    #[test]
    fn test_run_writes_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("music.raw");
        let output = dir.path().join("card.img");
        std::fs::write(&input, [0x42u8; 10]).unwrap();

        run(&input, &output).unwrap();

        let image = std::fs::read(&output).unwrap();
        assert_eq!(image[100 * 512], 0x42);
        assert_eq!(image[100 * 512 + 10], SILENCE_SAMPLE);
    }
}
