//! Property tests for windowed block reads through the SD driver.
#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
)]

use firmware::SdCard;
use platform::mocks::{block_pattern, MockChipSelect, SimulatedCard};
use platform::{BlockDevice, IoError, BLOCK_SIZE};
use proptest::prelude::*;

const SENTINEL: u8 = 0xEE;

fn ready_card() -> SdCard<SimulatedCard, MockChipSelect> {
    let sim = SimulatedCard::new();
    let cs = sim.chip_select();
    let mut card = SdCard::new(sim, cs);
    card.initialize().unwrap();
    card
}

fn window() -> impl Strategy<Value = (u16, u16)> {
    (0..BLOCK_SIZE as u16).prop_flat_map(|offset| {
        (Just(offset), 0..=(BLOCK_SIZE as u16 - offset))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Exactly `length` bytes land at `offset`; everything else is untouched.
    #[test]
    fn prop_read_copies_exact_sub_range(block in 0u32..10_000, (offset, length) in window()) {
        let mut card = ready_card();
        let mut buffer = [SENTINEL; BLOCK_SIZE];

        card.read_partial(block, &mut buffer, offset, length).unwrap();

        let start = usize::from(offset);
        let end = start + usize::from(length);
        for (i, &byte) in buffer.iter().enumerate() {
            if (start..end).contains(&i) {
                prop_assert_eq!(byte, block_pattern(block, i), "byte {}", i);
            } else {
                prop_assert_eq!(byte, SENTINEL, "byte {} outside window", i);
            }
        }
        prop_assert!(!card.transport().is_selected());
    }

    /// Windows past the block end never reach the bus.
    #[test]
    fn prop_out_of_block_window_is_rejected_before_traffic(
        offset in 0u16..1024,
        length in 0u16..1024,
    ) {
        prop_assume!(offset >= BLOCK_SIZE as u16 || offset + length > BLOCK_SIZE as u16);
        let mut card = ready_card();
        let before = card.transport().transfer_count();
        let mut buffer = [SENTINEL; 1024];

        let result = card.read_partial(0, &mut buffer, offset, length);

        prop_assert_eq!(result, Err(IoError::OffsetOutOfRange));
        prop_assert_eq!(card.transport().transfer_count(), before);
        prop_assert!(buffer.iter().all(|&b| b == SENTINEL));
    }
}
