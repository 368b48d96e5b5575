// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Work partitioning and the all-gather collective (C7). Each rank owns a
//! contiguous slice of the `xbins * zbins` wake-grid points; counts are
//! spread as evenly as possible with the remainder going to the
//! lowest-numbered ranks, matching `divmod`-based partitioning.

use mpi::topology::Communicator;
use mpi::traits::*;

/// Per-rank `(counts, displacements)` for `work_size` items spread over
/// `n_ranks` ranks: the first `work_size % n_ranks` ranks get one extra
/// item.
pub fn partition_counts(work_size: usize, n_ranks: usize) -> (Vec<usize>, Vec<usize>) {
    assert!(n_ranks > 0);
    let ave = work_size / n_ranks;
    let rem = work_size % n_ranks;
    let counts: Vec<usize> = (0..n_ranks).map(|p| if p < rem { ave + 1 } else { ave }).collect();
    let mut displs = Vec::with_capacity(n_ranks);
    let mut running = 0usize;
    for &c in &counts {
        displs.push(running);
        running += c;
    }
    (counts, displs)
}

/// This rank's `[start, end)` half-open slice of `work_size` items.
pub fn local_range(work_size: usize, n_ranks: usize, rank: usize) -> (usize, usize) {
    let (counts, displs) = partition_counts(work_size, n_ranks);
    (displs[rank], displs[rank] + counts[rank])
}

/// Thin wrapper over an MPI communicator (or a single-peer stand-in when
/// run with one rank) used to all-gather the per-rank wake contributions
/// into the full `xbins * zbins` grid.
pub struct Partitioner {
    size: usize,
    rank: usize,
    comm: Option<mpi::topology::SystemCommunicator>,
}

impl Partitioner {
    pub fn from_world() -> Partitioner {
        match mpi::initialize() {
            Some(universe) => {
                let world = universe.world();
                let size = world.size() as usize;
                let rank = world.rank() as usize;
                // Leak the Universe guard so MPI stays initialized for the
                // lifetime of the process; it is only ever finalized on exit.
                std::mem::forget(universe);
                Partitioner { size, rank, comm: Some(world) }
            }
            None => Partitioner { size: 1, rank: 0, comm: None },
        }
    }

    pub fn single() -> Partitioner {
        Partitioner { size: 1, rank: 0, comm: None }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    pub fn local_range(&self, work_size: usize) -> (usize, usize) {
        local_range(work_size, self.size, self.rank)
    }

    /// Gather each rank's contribution to a flat `work_size`-length buffer
    /// into the full buffer on every rank. With no communicator (single
    /// process), this is a no-op copy.
    pub fn all_gather(&self, local: &[f64], work_size: usize) -> Vec<f64> {
        match &self.comm {
            Some(world) => {
                let (counts, displs) = partition_counts(work_size, self.size);
                let counts_i: Vec<i32> = counts.iter().map(|&c| c as i32).collect();
                let displs_i: Vec<i32> = displs.iter().map(|&d| d as i32).collect();
                let mut full = vec![0.0f64; work_size];
                let mut partition = mpi::datatype::PartitionMut::new(&mut full[..], counts_i, displs_i);
                world.all_gather_varcount_into(local, &mut partition);
                full
            }
            None => local.to_vec(),
        }
    }
}
