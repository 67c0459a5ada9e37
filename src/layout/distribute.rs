//! # Overflow Distribution
//!
//! Splits the advertisement blocks between two regions: a *primary* region
//! that is tried first, and an *overflow* region that takes what the primary
//! cannot hold. Regions measure themselves, so the distributor only ever
//! appends, removes, and compares rendered height against capacity.
//!
//! The fill is greedy and never splits a block. When the blocks do not fit
//! the primary region as a whole, one region is filled block by block until
//! the next block would overflow it, and that block plus everything after
//! it goes to the other region:
//!
//! - normal mode: the overflow region fills first, the rest continues in the
//!   primary region;
//! - many-ads mode: the primary region fills first, the rest continues in
//!   the overflow region.
//!
//! Whatever still does not fit is placed anyway and reported through
//! [`Distribution::warning`]. There is no third region and no shrinking.

use tracing::{debug, warn};

/// Overflow of up to one unit still counts as fitting. Measured heights are
/// fractional and a rounding hair should not push a block out.
pub const FIT_TOLERANCE: f64 = 1.0;

/// A capacity-bounded container the distributor can fill.
pub trait Region<B> {
    /// Remove every block.
    fn clear(&mut self);
    fn append(&mut self, block: B);
    /// Remove and return the most recently appended block.
    fn remove_last(&mut self) -> Option<B>;
    /// Height of the current contents.
    fn rendered_height(&self) -> f64;
    /// Height available to contents, when known.
    fn capacity_height(&self) -> Option<f64>;
}

/// The outcome of a distribution pass. Placement lives in the regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    /// Content exceeds at least one region even after the split.
    pub warning: bool,
}

/// Capacity with unknown, negative or NaN values read as zero. `+inf` is an
/// unbounded region.
fn capacity<B>(region: &impl Region<B>) -> f64 {
    match region.capacity_height() {
        Some(c) if c >= 0.0 => c,
        _ => 0.0,
    }
}

fn overflows<B>(region: &impl Region<B>) -> bool {
    region.rendered_height() > capacity(region) + FIT_TOLERANCE
}

/// Distribute `blocks` across `primary` and `overflow`.
///
/// Both regions are cleared first and receive clones; `blocks` is left
/// untouched. Every block ends up in exactly one region, in source order
/// within each region. Never fails.
pub fn distribute<B, P, O>(
    blocks: &[B],
    primary: &mut P,
    overflow: &mut O,
    many_ads: bool,
) -> Distribution
where
    B: Clone,
    P: Region<B>,
    O: Region<B>,
{
    primary.clear();
    overflow.clear();

    for block in blocks {
        primary.append(block.clone());
    }
    if !overflows(primary) {
        debug!(blocks = blocks.len(), many_ads, "all blocks fit the primary region");
        return Distribution { warning: false };
    }

    primary.clear();
    overflow.clear();

    let split_at = if many_ads {
        fill_until_full(blocks, primary, overflow)
    } else {
        fill_until_full(blocks, overflow, primary)
    };
    debug!(
        blocks = blocks.len(),
        split_at,
        many_ads,
        "split blocks between regions"
    );

    let warning = overflows(primary) || overflows(overflow);
    if warning {
        warn!(
            primary_height = primary.rendered_height(),
            primary_capacity = capacity(primary),
            overflow_height = overflow.rendered_height(),
            overflow_capacity = capacity(overflow),
            "advertisements do not fit the available space"
        );
    }
    Distribution { warning }
}

/// Append blocks to `first` until one overflows it; that block and all later
/// ones go to `rest`. Returns how many blocks stayed in `first`.
fn fill_until_full<B, F, R>(blocks: &[B], first: &mut F, rest: &mut R) -> usize
where
    B: Clone,
    F: Region<B>,
    R: Region<B>,
{
    for (i, block) in blocks.iter().enumerate() {
        first.append(block.clone());
        if overflows(first) {
            first.remove_last();
            for block in &blocks[i..] {
                rest.append(block.clone());
            }
            return i;
        }
    }
    blocks.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[derive(Debug, Clone, PartialEq)]
    struct Block {
        id: usize,
        height: f64,
    }

    /// Blocks stacked without gaps.
    #[derive(Debug)]
    struct Stack {
        capacity: Option<f64>,
        blocks: Vec<Block>,
    }

    impl Stack {
        fn new(capacity: f64) -> Self {
            Self {
                capacity: Some(capacity),
                blocks: Vec::new(),
            }
        }

        fn ids(&self) -> Vec<usize> {
            self.blocks.iter().map(|b| b.id).collect()
        }
    }

    impl Region<Block> for Stack {
        fn clear(&mut self) {
            self.blocks.clear();
        }
        fn append(&mut self, block: Block) {
            self.blocks.push(block);
        }
        fn remove_last(&mut self) -> Option<Block> {
            self.blocks.pop()
        }
        fn rendered_height(&self) -> f64 {
            self.blocks.iter().map(|b| b.height).sum()
        }
        fn capacity_height(&self) -> Option<f64> {
            self.capacity
        }
    }

    fn blocks(heights: &[f64]) -> Vec<Block> {
        heights
            .iter()
            .enumerate()
            .map(|(i, &height)| Block { id: i + 1, height })
            .collect()
    }

    fn run(
        heights: &[f64],
        primary_cap: f64,
        overflow_cap: f64,
        many_ads: bool,
    ) -> (Stack, Stack, bool) {
        let mut primary = Stack::new(primary_cap);
        let mut overflow = Stack::new(overflow_cap);
        let d = distribute(&blocks(heights), &mut primary, &mut overflow, many_ads);
        (primary, overflow, d.warning)
    }

    #[test]
    fn three_blocks_spill_into_overflow_first() {
        let (primary, overflow, warning) = run(&[40.0, 40.0, 40.0], 100.0, 100.0, false);
        assert_eq!(overflow.ids(), vec![1, 2]);
        assert_eq!(primary.ids(), vec![3]);
        assert!(!warning);
    }

    #[test]
    fn many_ads_fills_primary_first() {
        let (primary, overflow, warning) = run(&[40.0, 40.0, 40.0], 100.0, 100.0, true);
        assert_eq!(primary.ids(), vec![1, 2]);
        assert_eq!(overflow.ids(), vec![3]);
        assert!(!warning);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn oversized_block_is_placed_whole_with_warning(#[case] many_ads: bool) {
        let (primary, overflow, warning) = run(&[150.0], 100.0, 100.0, many_ads);
        assert!(warning);
        if many_ads {
            assert!(primary.ids().is_empty());
            assert_eq!(overflow.ids(), vec![1]);
        } else {
            assert_eq!(primary.ids(), vec![1]);
            assert!(overflow.ids().is_empty());
        }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn empty_input(#[case] many_ads: bool) {
        let mut primary = Stack::new(100.0);
        let mut overflow = Stack::new(100.0);
        primary.append(Block { id: 9, height: 10.0 });
        overflow.append(Block { id: 8, height: 10.0 });
        let none: Vec<Block> = Vec::new();
        let d = distribute(&none, &mut primary, &mut overflow, many_ads);
        assert!(primary.ids().is_empty());
        assert!(overflow.ids().is_empty());
        assert!(!d.warning);
    }

    #[rstest]
    #[case(&[30.0, 30.0, 30.0], 100.0)]
    #[case(&[50.0, 51.0], 100.0)] // 101 is within tolerance
    #[case(&[], 0.0)]
    fn content_that_fits_stays_in_primary(#[case] heights: &[f64], #[case] cap: f64) {
        for many_ads in [false, true] {
            let (primary, overflow, warning) = run(heights, cap, 10.0, many_ads);
            assert_eq!(primary.ids(), (1..=heights.len()).collect::<Vec<_>>());
            assert!(overflow.ids().is_empty());
            assert!(!warning);
        }
    }

    #[test]
    fn excess_beyond_tolerance_does_not_fit() {
        let (primary, overflow, _) = run(&[50.0, 51.5], 100.0, 110.0, false);
        assert_eq!(overflow.ids(), vec![1, 2]);
        assert!(primary.ids().is_empty());
    }

    #[rstest]
    #[case(&[10.0, 80.0, 30.0, 25.0, 60.0, 5.0], 100.0, 90.0)]
    #[case(&[120.0, 10.0, 10.0], 100.0, 100.0)]
    #[case(&[45.0; 9], 100.0, 150.0)]
    #[case(&[1.0, 2.0, 3.0], 0.0, 0.0)]
    fn every_block_placed_once_in_order(
        #[case] heights: &[f64],
        #[case] primary_cap: f64,
        #[case] overflow_cap: f64,
    ) {
        for many_ads in [false, true] {
            let (primary, overflow, _) = run(heights, primary_cap, overflow_cap, many_ads);
            let (p, o) = (primary.ids(), overflow.ids());
            assert!(p.windows(2).all(|w| w[0] < w[1]));
            assert!(o.windows(2).all(|w| w[0] < w[1]));
            let mut all: Vec<usize> = p.into_iter().chain(o).collect();
            all.sort_unstable();
            assert_eq!(all, (1..=heights.len()).collect::<Vec<_>>());
        }
    }

    #[rstest]
    #[case(&[60.0, 60.0, 60.0], 100.0, 100.0)]
    #[case(&[30.0, 90.0, 20.0, 70.0], 80.0, 120.0)]
    #[case(&[200.0, 10.0], 100.0, 150.0)]
    fn modes_mirror_each_other_when_neither_region_suffices(
        #[case] heights: &[f64],
        #[case] a: f64,
        #[case] b: f64,
    ) {
        let total: f64 = heights.iter().sum();
        assert!(total > a + FIT_TOLERANCE && total > b + FIT_TOLERANCE);

        let (normal_primary, normal_overflow, normal_warning) = run(heights, a, b, false);
        let (many_primary, many_overflow, many_warning) = run(heights, b, a, true);
        assert_eq!(normal_overflow.ids(), many_primary.ids());
        assert_eq!(normal_primary.ids(), many_overflow.ids());
        assert_eq!(normal_warning, many_warning);
    }

    #[test]
    fn rerunning_gives_the_same_placement() {
        let input = blocks(&[35.0, 50.0, 40.0, 20.0]);
        let mut primary = Stack::new(90.0);
        let mut overflow = Stack::new(70.0);

        let first = distribute(&input, &mut primary, &mut overflow, false);
        let placed = (primary.ids(), overflow.ids());
        let second = distribute(&input, &mut primary, &mut overflow, false);

        assert_eq!(first, second);
        assert_eq!((primary.ids(), overflow.ids()), placed);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(-5.0))]
    #[case(Some(f64::NAN))]
    #[case(Some(f64::NEG_INFINITY))]
    fn unusable_capacity_reads_as_zero(#[case] cap: Option<f64>) {
        let mut primary = Stack {
            capacity: cap,
            blocks: Vec::new(),
        };
        let mut overflow = Stack::new(100.0);
        let d = distribute(&blocks(&[20.0, 30.0]), &mut primary, &mut overflow, false);
        assert_eq!(overflow.ids(), vec![1, 2]);
        assert!(primary.ids().is_empty());
        assert!(!d.warning);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn unbounded_primary_takes_everything(#[case] many_ads: bool) {
        let (primary, overflow, warning) =
            run(&[400.0, 900.0, 1200.0], f64::INFINITY, 10.0, many_ads);
        assert_eq!(primary.ids(), vec![1, 2, 3]);
        assert!(overflow.ids().is_empty());
        assert!(!warning);
    }

    #[test]
    fn warning_when_both_regions_fill() {
        let (primary, overflow, warning) = run(&[60.0, 60.0, 60.0, 60.0], 100.0, 100.0, false);
        assert_eq!(overflow.ids(), vec![1]);
        assert_eq!(primary.ids(), vec![2, 3, 4]);
        assert!(warning);
    }

    #[test]
    fn input_blocks_are_not_consumed() {
        let input = blocks(&[70.0, 70.0]);
        let before = input.clone();
        let mut primary = Stack::new(100.0);
        let mut overflow = Stack::new(100.0);
        distribute(&input, &mut primary, &mut overflow, true);
        assert_eq!(input, before);
    }
}
