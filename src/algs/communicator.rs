//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte slices. Point-to-point handles are waitable;
//! the two collective operations every migration phase is built from
//! ([`Communicator::all_to_all_counts`] and [`Communicator::all_to_allv_bytes`])
//! have provided implementations on top of them, which backends with native
//! collectives override.
//!
//! Every rank must enter the same collectives in the same order. There is no
//! timeout: a desynchronized protocol hangs.

use crate::mesh_error::MeshError;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Message tag of a point-to-point message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Count messages of [`Communicator::all_to_all_counts`].
    pub const COUNTS: CommTag = CommTag(0x0100);
    /// Payload messages of [`Communicator::all_to_allv_bytes`].
    pub const PAYLOAD: CommTag = CommTag(0x0101);

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Non-blocking communication interface.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: CommTag) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Send `send[r]` to every rank `r` and return what each rank sent here.
    fn all_to_all_counts(&self, send: &[usize]) -> Result<Vec<usize>, MeshError> {
        let (me, n) = (self.rank(), self.size());
        check_len("all_to_all_counts", n, send.len())?;
        let tag = CommTag::COUNTS;

        let recvs: Vec<_> = (0..n)
            .filter(|&r| r != me)
            .map(|r| (r, self.irecv(r, tag)))
            .collect();
        let sends: Vec<_> = (0..n)
            .filter(|&r| r != me)
            .map(|r| self.isend(r, tag, &(send[r] as u64).to_le_bytes()))
            .collect();

        let mut out = vec![0usize; n];
        out[me] = send[me];
        for (r, h) in recvs {
            let raw = h
                .wait()
                .ok_or_else(|| MeshError::comm(r, "no count received"))?;
            let bytes: [u8; 8] = raw
                .as_slice()
                .try_into()
                .map_err(|_| MeshError::comm(r, format!("count message has {} bytes", raw.len())))?;
            out[r] = u64::from_le_bytes(bytes) as usize;
        }
        for s in sends {
            let _ = s.wait();
        }
        Ok(out)
    }

    /// Variable-length all-to-all on raw bytes.
    ///
    /// `send` holds the bytes for rank 0, then rank 1, and so on. The result
    /// holds the bytes from each source in ascending rank order.
    fn all_to_allv_bytes(
        &self,
        send: &[u8],
        send_counts: &[usize],
        recv_counts: &[usize],
    ) -> Result<Vec<u8>, MeshError> {
        let (me, n) = (self.rank(), self.size());
        check_len("all_to_allv send counts", n, send_counts.len())?;
        check_len("all_to_allv recv counts", n, recv_counts.len())?;
        check_len("all_to_allv send buffer", send_counts.iter().sum(), send.len())?;
        let tag = CommTag::PAYLOAD;

        let recvs: Vec<_> = (0..n)
            .filter(|&r| r != me && recv_counts[r] > 0)
            .map(|r| (r, self.irecv(r, tag)))
            .collect();
        let mut sends = Vec::new();
        let mut off = 0;
        let mut mine = &send[0..0];
        for (r, &cnt) in send_counts.iter().enumerate() {
            let chunk = &send[off..off + cnt];
            off += cnt;
            if r == me {
                mine = chunk;
            } else if cnt > 0 {
                sends.push(self.isend(r, tag, chunk));
            }
        }
        check_len("all_to_allv self part", recv_counts[me], mine.len())?;

        let mut parts: Vec<Option<Vec<u8>>> = vec![None; n];
        for (r, h) in recvs {
            let raw = h
                .wait()
                .ok_or_else(|| MeshError::comm(r, "no payload received"))?;
            if raw.len() != recv_counts[r] {
                return Err(MeshError::comm(
                    r,
                    format!("expected {} bytes, got {}", recv_counts[r], raw.len()),
                ));
            }
            parts[r] = Some(raw);
        }
        for s in sends {
            let _ = s.wait();
        }

        let mut out = Vec::with_capacity(recv_counts.iter().sum());
        for (r, part) in parts.into_iter().enumerate() {
            if r == me {
                out.extend_from_slice(mine);
            } else if let Some(p) = part {
                out.extend_from_slice(&p);
            }
        }
        Ok(out)
    }
}

fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<(), MeshError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MeshError::BufferMismatch {
            context,
            expected,
            actual,
        })
    }
}

/// Single-rank communicator for serial use and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: CommTag, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: CommTag) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

// --- ThreadComm: ranks simulated by threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = Arc<DashMap<Key, VecDeque<Bytes>>>;

/// In-process rank backed by a mailbox shared with its sibling ranks.
///
/// Messages between a pair of ranks with one tag are delivered in send order.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Mailbox,
}

impl ThreadComm {
    /// One communicator per rank of an `n`-rank universe.
    pub fn universe(n: usize) -> Vec<ThreadComm> {
        let mailbox: Mailbox = Arc::new(DashMap::new());
        (0..n)
            .map(|rank| ThreadComm {
                rank,
                size: n,
                mailbox: mailbox.clone(),
            })
            .collect()
    }
}

pub struct ThreadRecv {
    key: Key,
    mailbox: Mailbox,
}

impl Wait for ThreadRecv {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(mut queue) = self.mailbox.get_mut(&self.key) {
                if let Some(bytes) = queue.pop_front() {
                    return Some(bytes.to_vec());
                }
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = ThreadRecv;

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) {
        self.mailbox
            .entry((self.rank, peer, tag.as_u16()))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: CommTag) -> ThreadRecv {
        ThreadRecv {
            key: (peer, self.rank, tag.as_u16()),
            mailbox: self.mailbox.clone(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

/// Run `f` on `n` simulated ranks, one thread each, and collect the results in
/// rank order. A panic on any rank is re-raised here.
pub fn run_local<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadComm) -> R + Sync,
{
    let comms = ThreadComm::universe(n);
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{
        Communicator as MpiCommunicator, CommunicatorCollectives, Destination, Source,
    };
    use mpi::Count;

    /// World communicator of an MPI job.
    ///
    /// Point-to-point sends are eager and blocking; every algorithm in this
    /// crate goes through the collectives, which map onto `MPI_Alltoall` and
    /// `MPI_Alltoallv`.
    pub struct MpiComm {
        // dropped before `_universe`, which finalizes MPI
        world: Arc<SimpleCommunicator>,
        _universe: Universe,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, MeshError> {
            let universe =
                mpi::initialize().ok_or_else(|| MeshError::comm(0, "MPI was already initialized"))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world: Arc::new(world),
                _universe: universe,
                rank,
                size,
            })
        }

        pub fn world(&self) -> &SimpleCommunicator {
            &self.world
        }
    }

    pub struct MpiRecv {
        world: Arc<SimpleCommunicator>,
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let (msg, _status) = self
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(msg)
        }
    }

    fn displacements(counts: &[Count]) -> Vec<Count> {
        counts
            .iter()
            .scan(0, |acc, &x| {
                let old = *acc;
                *acc += x;
                Some(old)
            })
            .collect()
    }

    fn to_count(context: &'static str, n: usize) -> Result<Count, MeshError> {
        Count::try_from(n).map_err(|_| MeshError::BufferMismatch {
            context,
            expected: Count::MAX as usize,
            actual: n,
        })
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag.as_u16() as i32);
        }

        fn irecv(&self, peer: usize, tag: CommTag) -> MpiRecv {
            MpiRecv {
                world: self.world.clone(),
                peer: peer as i32,
                tag: tag.as_u16() as i32,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn all_to_all_counts(&self, send: &[usize]) -> Result<Vec<usize>, MeshError> {
            check_len("all_to_all_counts", self.size, send.len())?;
            let send: Vec<u64> = send.iter().map(|&c| c as u64).collect();
            let mut recv = vec![0u64; self.size];
            self.world.all_to_all_into(&send[..], &mut recv[..]);
            Ok(recv.into_iter().map(|c| c as usize).collect())
        }

        fn all_to_allv_bytes(
            &self,
            send: &[u8],
            send_counts: &[usize],
            recv_counts: &[usize],
        ) -> Result<Vec<u8>, MeshError> {
            check_len("all_to_allv send counts", self.size, send_counts.len())?;
            check_len("all_to_allv recv counts", self.size, recv_counts.len())?;
            check_len("all_to_allv send buffer", send_counts.iter().sum(), send.len())?;
            let sc = send_counts
                .iter()
                .map(|&c| to_count("all_to_allv send count", c))
                .collect::<Result<Vec<_>, _>>()?;
            let rc = recv_counts
                .iter()
                .map(|&c| to_count("all_to_allv recv count", c))
                .collect::<Result<Vec<_>, _>>()?;
            let (sd, rd) = (displacements(&sc), displacements(&rc));
            let mut recv = vec![0u8; recv_counts.iter().sum()];
            {
                let send_partition = Partition::new(send, &sc[..], &sd[..]);
                let mut recv_partition = PartitionMut::new(&mut recv[..], &rc[..], &rd[..]);
                self.world
                    .all_to_all_varcount_into(&send_partition, &mut recv_partition);
            }
            Ok(recv)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::{MpiComm, MpiRecv};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_roundtrip_two_ranks() {
        let comms = ThreadComm::universe(2);
        let recv = comms[1].irecv(0, CommTag(7));
        comms[0].isend(1, CommTag(7), &[1, 2, 3, 4]);
        comms[0].isend(1, CommTag(7), &[5]);
        assert_eq!(recv.wait(), Some(vec![1, 2, 3, 4]));
        assert_eq!(comms[1].irecv(0, CommTag(7)).wait(), Some(vec![5]));
    }

    #[test]
    fn no_comm_collectives_copy_self_part() {
        let comm = NoComm;
        assert_eq!(comm.all_to_all_counts(&[3]).unwrap(), vec![3]);
        assert_eq!(
            comm.all_to_allv_bytes(&[9, 8, 7], &[3], &[3]).unwrap(),
            vec![9, 8, 7]
        );
        assert!(comm.all_to_all_counts(&[1, 2]).is_err());
    }

    #[test]
    fn run_local_counts_transpose() {
        let out = run_local(3, |comm| {
            let me = comm.rank();
            let send: Vec<usize> = (0..3).map(|r| 10 * me + r).collect();
            comm.all_to_all_counts(&send).unwrap()
        });
        assert_eq!(out[0], vec![0, 10, 20]);
        assert_eq!(out[2], vec![2, 12, 22]);
    }

    #[test]
    fn run_local_bytes_grouped_by_source() {
        let out = run_local(3, |comm| {
            let me = comm.rank() as u8;
            // rank r sends (r + 1) copies of its id to every rank
            let send: Vec<u8> = (0..3).flat_map(|_| vec![me; me as usize + 1]).collect();
            let counts = vec![me as usize + 1; 3];
            let recv_counts = comm.all_to_all_counts(&counts).unwrap();
            comm.all_to_allv_bytes(&send, &counts, &recv_counts).unwrap()
        });
        for recv in out {
            assert_eq!(recv, vec![0, 1, 1, 2, 2, 2]);
        }
    }
}
