//! The three sorting algorithms, instrumented for observation
//!
//! Each algorithm calls back into a [`SortObserver`] after every unit of
//! work (so the caller can give up the CPU) and after every outer pass (so
//! the caller can print the array). Each one stops as soon as the array is
//! found to be in order.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Priority;

/// Which sorting algorithm a worker runs
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Bubble,
    Insertion,
    Quick,
}

impl Algorithm {
    /// All the algorithms, in the order their workers are created
    pub const ALL: [Algorithm; 3] = [Algorithm::Bubble, Algorithm::Insertion, Algorithm::Quick];

    /// The name used in console output
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Bubble => "Bubble",
            Algorithm::Insertion => "Insertion",
            Algorithm::Quick => "Quick",
        }
    }

    /// The priority of the worker running this algorithm
    ///
    /// The slowest algorithm gets the highest priority, so it keeps cutting
    /// in front of the faster ones.
    pub const fn priority(self) -> Priority {
        match self {
            Algorithm::Bubble => Priority::High,
            Algorithm::Insertion => Priority::Normal,
            Algorithm::Quick => Priority::Low,
        }
    }

    /// The most progress reports a sort of `n` elements can produce
    pub const fn max_passes(self, n: usize) -> usize {
        n.saturating_sub(1)
    }

    /// Sort `data` in place with this algorithm
    pub fn sort<O: SortObserver>(self, data: &mut [i32], observer: &mut O) -> Result<(), O::Error> {
        match self {
            Algorithm::Bubble => bubble_sort(data, observer),
            Algorithm::Insertion => insertion_sort(data, observer),
            Algorithm::Quick => quick_sort(data, observer),
        }
    }
}

impl core::fmt::Display for Algorithm {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.write_str(self.name())
    }
}

/// Gets told what a sort is doing, as it does it
pub trait SortObserver {
    type Error;

    /// One comparison, swap or shift has happened
    fn step(&mut self) -> Result<(), Self::Error>;

    /// One outer pass has finished; here is the whole array
    fn pass(&mut self, data: &[i32]) -> Result<(), Self::Error>;
}

/// Is the slice in non-decreasing order?
pub fn is_sorted(data: &[i32]) -> bool {
    data.windows(2).all(|pair| pair[0] <= pair[1])
}

/// Adjacent-swap passes, stopping once a pass changes nothing or the array
/// is in order
pub fn bubble_sort<O: SortObserver>(data: &mut [i32], observer: &mut O) -> Result<(), O::Error> {
    let n = data.len();
    for i in 0..n.saturating_sub(1) {
        let mut swapped = false;
        for j in 0..(n - i - 1) {
            if data[j] > data[j + 1] {
                data.swap(j, j + 1);
                swapped = true;
            }
            observer.step()?;
        }
        observer.pass(data)?;
        if !swapped || is_sorted(data) {
            break;
        }
    }
    Ok(())
}

/// Shift-and-insert, checking for order after each element is placed
pub fn insertion_sort<O: SortObserver>(data: &mut [i32], observer: &mut O) -> Result<(), O::Error> {
    for i in 1..data.len() {
        let key = data[i];
        let mut j = i;
        while j > 0 && data[j - 1] > key {
            data[j] = data[j - 1];
            j -= 1;
            observer.step()?;
        }
        data[j] = key;
        observer.pass(data)?;
        if is_sorted(data) {
            break;
        }
        observer.step()?;
    }
    Ok(())
}

/// Lomuto-partition quicksort, abandoning all outstanding partitions once
/// the array is in order
pub fn quick_sort<O: SortObserver>(data: &mut [i32], observer: &mut O) -> Result<(), O::Error> {
    let mut sorted = false;
    let len = data.len();
    quick_sort_range(data, 0, len, &mut sorted, observer)
}

/// Sort `data[low..high]`, where `sorted` is shared by the whole call tree
fn quick_sort_range<O: SortObserver>(
    data: &mut [i32],
    low: usize,
    high: usize,
    sorted: &mut bool,
    observer: &mut O,
) -> Result<(), O::Error> {
    if *sorted || high.saturating_sub(low) < 2 {
        return Ok(());
    }

    let pivot_idx = partition(data, low, high, observer)?;
    observer.pass(data)?;
    if is_sorted(data) {
        *sorted = true;
        return Ok(());
    }

    observer.step()?;
    quick_sort_range(data, low, pivot_idx, sorted, observer)?;
    observer.step()?;
    quick_sort_range(data, pivot_idx + 1, high, sorted, observer)
}

/// Partition `data[low..high]` around its last element, returning where
/// the pivot ended up
fn partition<O: SortObserver>(
    data: &mut [i32],
    low: usize,
    high: usize,
    observer: &mut O,
) -> Result<usize, O::Error> {
    let last = high - 1;
    let pivot = data[last];
    let mut store = low;
    for j in low..last {
        if data[j] <= pivot {
            data.swap(store, j);
            store += 1;
        }
        observer.step()?;
    }
    data.swap(store, last);
    Ok(store)
}


// End of File
