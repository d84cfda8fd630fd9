//! Collective exchange planning.
//!
//! An [`ExchangePlan`] is the CSR description of one variable-length
//! all-to-all: how many items go to each rank, how many come from each rank,
//! and the prefix-summed offsets of both. Receive counts are always obtained
//! from a preceding count exchange, so the plan at the destination matches the
//! plan at the source without a further handshake.

use crate::algs::communicator::Communicator;
use crate::algs::wire::{self, WireCount, WireId};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use bytemuck::Pod;
use std::mem::size_of;
use std::ops::Range;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExchangePlan {
    send_counts: Vec<usize>,
    recv_counts: Vec<usize>,
    send_offsets: Vec<usize>,
    recv_offsets: Vec<usize>,
}

fn prefix_sum(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    offsets.push(0);
    let mut acc = 0;
    for &c in counts {
        acc += c;
        offsets.push(acc);
    }
    offsets
}

/// Per-rank sums of `strides` over the consecutive ranges given by `offsets`.
fn sum_ranges(offsets: &[usize], strides: &[usize]) -> Vec<usize> {
    offsets
        .windows(2)
        .map(|w| strides[w[0]..w[1]].iter().sum())
        .collect()
}

impl ExchangePlan {
    /// Count items per destination rank, then exchange the counts.
    pub fn from_destinations<C: Communicator>(dest: &[usize], comm: &C) -> Result<Self, MeshError> {
        let n = comm.size();
        let mut send_counts = vec![0usize; n];
        for &d in dest {
            *send_counts
                .get_mut(d)
                .ok_or_else(|| MeshError::comm(d, format!("destination rank {d} of {n}")))? += 1;
        }
        Self::from_send_counts(send_counts, comm)
    }

    /// Exchange `send_counts` to learn the receive side.
    pub fn from_send_counts<C: Communicator>(
        send_counts: Vec<usize>,
        comm: &C,
    ) -> Result<Self, MeshError> {
        let recv_counts = comm.all_to_all_counts(&send_counts)?;
        Self::from_counts(send_counts, recv_counts)
    }

    /// Build a plan from counts already known on both sides.
    pub fn from_counts(send_counts: Vec<usize>, recv_counts: Vec<usize>) -> Result<Self, MeshError> {
        if send_counts.len() != recv_counts.len() {
            return Err(MeshError::BufferMismatch {
                context: "exchange plan ranks",
                expected: send_counts.len(),
                actual: recv_counts.len(),
            });
        }
        let plan = Self {
            send_offsets: prefix_sum(&send_counts),
            recv_offsets: prefix_sum(&recv_counts),
            send_counts,
            recv_counts,
        };
        plan.debug_assert_invariants();
        Ok(plan)
    }

    /// Plan for a variable-length payload of the same items.
    ///
    /// `send_strides[i]` is the payload length of the i-th item sent and
    /// `recv_strides[j]` that of the j-th item received, as already exchanged
    /// through this plan. No communication happens.
    pub fn with_strides(&self, send_strides: &[usize], recv_strides: &[usize]) -> Result<Self, MeshError> {
        if send_strides.len() != self.total_send() {
            return Err(MeshError::BufferMismatch {
                context: "send strides",
                expected: self.total_send(),
                actual: send_strides.len(),
            });
        }
        if recv_strides.len() != self.total_recv() {
            return Err(MeshError::BufferMismatch {
                context: "receive strides",
                expected: self.total_recv(),
                actual: recv_strides.len(),
            });
        }
        Self::from_counts(
            sum_ranges(&self.send_offsets, send_strides),
            sum_ranges(&self.recv_offsets, recv_strides),
        )
    }

    /// The plan of the reply: what was received gets sent back.
    pub fn reversed(&self) -> Self {
        Self {
            send_counts: self.recv_counts.clone(),
            recv_counts: self.send_counts.clone(),
            send_offsets: self.recv_offsets.clone(),
            recv_offsets: self.send_offsets.clone(),
        }
    }

    pub fn n_ranks(&self) -> usize {
        self.send_counts.len()
    }

    pub fn send_counts(&self) -> &[usize] {
        &self.send_counts
    }

    pub fn recv_counts(&self) -> &[usize] {
        &self.recv_counts
    }

    pub fn send_offsets(&self) -> &[usize] {
        &self.send_offsets
    }

    pub fn recv_offsets(&self) -> &[usize] {
        &self.recv_offsets
    }

    pub fn total_send(&self) -> usize {
        self.send_offsets[self.send_offsets.len() - 1]
    }

    pub fn total_recv(&self) -> usize {
        self.recv_offsets[self.recv_offsets.len() - 1]
    }

    /// Positions in the send buffer bound for `rank`.
    pub fn send_range(&self, rank: usize) -> Range<usize> {
        self.send_offsets[rank]..self.send_offsets[rank + 1]
    }

    /// Positions in the receive buffer that came from `rank`.
    pub fn recv_range(&self, rank: usize) -> Range<usize> {
        self.recv_offsets[rank]..self.recv_offsets[rank + 1]
    }

    /// Source rank of every received item, in receive order.
    pub fn recv_sources(&self) -> Vec<usize> {
        let mut src = Vec::with_capacity(self.total_recv());
        for (r, &c) in self.recv_counts.iter().enumerate() {
            src.extend(std::iter::repeat_n(r, c));
        }
        src
    }

    /// Run the all-to-all. `send` must be grouped by destination rank.
    pub fn exchange<T: Pod, C: Communicator>(&self, send: &[T], comm: &C) -> Result<Vec<T>, MeshError> {
        if send.len() != self.total_send() {
            return Err(MeshError::BufferMismatch {
                context: "exchange send buffer",
                expected: self.total_send(),
                actual: send.len(),
            });
        }
        let sz = size_of::<T>();
        let sc: Vec<usize> = self.send_counts.iter().map(|c| c * sz).collect();
        let rc: Vec<usize> = self.recv_counts.iter().map(|c| c * sz).collect();
        let bytes = comm.all_to_allv_bytes(wire::encode(send), &sc, &rc)?;
        let out: Vec<T> = wire::decode("exchange receive buffer", &bytes)?;
        if out.len() != self.total_recv() {
            return Err(MeshError::BufferMismatch {
                context: "exchange receive buffer",
                expected: self.total_recv(),
                actual: out.len(),
            });
        }
        Ok(out)
    }

    /// [`exchange`](Self::exchange) for global ids.
    pub fn exchange_ids<C: Communicator>(
        &self,
        send: &[GlobalId],
        comm: &C,
    ) -> Result<Vec<GlobalId>, MeshError> {
        let wire: Vec<WireId> = send.iter().map(|&g| WireId::of(g)).collect();
        Ok(self.exchange(&wire, comm)?.iter().map(WireId::get).collect())
    }

    /// [`exchange`](Self::exchange) for strides and counts.
    pub fn exchange_counts<C: Communicator>(
        &self,
        send: &[usize],
        comm: &C,
    ) -> Result<Vec<usize>, MeshError> {
        let wire: Vec<WireCount> = send.iter().map(|&n| WireCount::new(n)).collect();
        Ok(self.exchange(&wire, comm)?.iter().map(WireCount::get).collect())
    }
}

impl DebugInvariants for ExchangePlan {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "exchange plan");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        for (counts, offsets, context) in [
            (&self.send_counts, &self.send_offsets, "send offsets"),
            (&self.recv_counts, &self.recv_offsets, "receive offsets"),
        ] {
            if offsets != &prefix_sum(counts) {
                return Err(MeshError::BufferMismatch {
                    context,
                    expected: counts.iter().sum(),
                    actual: offsets.last().copied().unwrap_or(0),
                });
            }
        }
        Ok(())
    }
}

/// Stable order of local items grouped by ascending destination rank.
pub fn sort_by_destination(dest: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..dest.len()).collect();
    order.sort_by_key(|&i| dest[i]);
    order
}

/// Gather every rank's `local` slice on every rank, grouped by rank.
///
/// Returns the per-rank counts and the concatenated data.
pub fn all_gatherv<T: Pod, C: Communicator>(
    local: &[T],
    comm: &C,
) -> Result<(Vec<usize>, Vec<T>), MeshError> {
    let n = comm.size();
    let plan = ExchangePlan::from_send_counts(vec![local.len(); n], comm)?;
    let mut send = Vec::with_capacity(local.len() * n);
    for _ in 0..n {
        send.extend_from_slice(local);
    }
    let data = plan.exchange(&send, comm)?;
    Ok((plan.recv_counts, data))
}

/// One number from every rank, in rank order.
pub fn all_gather_count<C: Communicator>(value: usize, comm: &C) -> Result<Vec<usize>, MeshError> {
    comm.all_to_all_counts(&vec![value; comm.size()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, run_local};

    #[test]
    fn strided_plan_sums_per_rank() {
        let plan = ExchangePlan::from_counts(vec![2, 1], vec![1, 3]).unwrap();
        let strided = plan.with_strides(&[4, 6, 5], &[2, 1, 1, 1]).unwrap();
        assert_eq!(strided.send_counts(), &[10, 5]);
        assert_eq!(strided.recv_counts(), &[2, 3]);
        assert_eq!(strided.recv_offsets(), &[0, 2, 5]);
        assert!(plan.with_strides(&[1], &[1, 1, 1, 1]).is_err());
    }

    #[test]
    fn reversed_swaps_sides() {
        let plan = ExchangePlan::from_counts(vec![2, 0, 1], vec![0, 4, 1]).unwrap();
        let back = plan.reversed();
        assert_eq!(back.send_counts(), plan.recv_counts());
        assert_eq!(back.recv_offsets(), plan.send_offsets());
        assert_eq!(plan.recv_sources(), vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn single_rank_exchange_is_identity() {
        let plan = ExchangePlan::from_destinations(&[0, 0, 0], &NoComm).unwrap();
        let out = plan.exchange(&[5u64, 6, 7], &NoComm).unwrap();
        assert_eq!(out, vec![5, 6, 7]);
        assert!(ExchangePlan::from_destinations(&[1], &NoComm).is_err());
    }

    #[test]
    fn sort_is_stable() {
        assert_eq!(sort_by_destination(&[1, 0, 1, 0]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn plans_are_symmetric_across_ranks() {
        let plans = run_local(3, |comm| {
            let me = comm.rank();
            let dest: Vec<usize> = (0..me + 2).map(|i| (i + me) % 3).collect();
            ExchangePlan::from_destinations(&dest, &comm).unwrap()
        });
        for (src, p) in plans.iter().enumerate() {
            for (dst, q) in plans.iter().enumerate() {
                assert_eq!(p.send_counts()[dst], q.recv_counts()[src]);
            }
            assert_eq!(p.total_recv(), p.recv_counts().iter().sum::<usize>());
        }
    }

    #[test]
    fn all_gatherv_concatenates_in_rank_order() {
        let out = run_local(3, |comm| {
            let local: Vec<u64> = (0..comm.rank() as u64).collect();
            all_gatherv(&local, &comm).unwrap()
        });
        for (counts, data) in out {
            assert_eq!(counts, vec![0, 1, 2]);
            assert_eq!(data, vec![0, 0, 1]);
        }
    }
}
