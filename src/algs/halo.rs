//! Halo exchange of per-cell values across interface patches.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::ExchangePlan;
use crate::mesh_error::MeshError;
use crate::topology::shard::MeshShard;
use bytemuck::Pod;

/// Exchange per-cell data across every patch of `shard`.
///
/// `data` holds `stride` values per local cell. For each patch face, the values
/// of its local owner go to the patch neighbor, and the neighbor's values for
/// the same face come back. Both sides order a message by global face id, so
/// their local patch orders need not agree. The result holds, per patch and in
/// patch order, `stride` received values per patch face.
pub fn exchange_interface_data<T: Pod, C: Communicator>(
    shard: &MeshShard,
    data: &[T],
    stride: usize,
    comm: &C,
) -> Result<Vec<Vec<T>>, MeshError> {
    if data.len() != shard.ncells() * stride {
        return Err(MeshError::BufferMismatch {
            context: "halo data",
            expected: shard.ncells() * stride,
            actual: data.len(),
        });
    }
    let n = comm.size();
    let gfaces = shard.gfaces();

    // positions of each patch in global face order
    let orders: Vec<Vec<usize>> = shard
        .patches
        .iter()
        .map(|p| {
            let mut order: Vec<usize> = (0..p.len()).collect();
            order.sort_by_key(|&i| gfaces[p.faces[i]]);
            order
        })
        .collect();

    let mut by_rank: Vec<Option<usize>> = vec![None; n];
    for (k, p) in shard.patches.iter().enumerate() {
        let slot = by_rank
            .get_mut(p.neighbor)
            .ok_or_else(|| MeshError::comm(p.neighbor, "patch neighbor is not a rank"))?;
        if slot.replace(k).is_some() {
            return Err(MeshError::InvalidConnectivity(format!(
                "two patches with rank {}",
                p.neighbor
            )));
        }
    }

    let mut send_counts = vec![0usize; n];
    let mut send = Vec::new();
    for (r, k) in by_rank.iter().enumerate() {
        let Some(k) = *k else { continue };
        let p = &shard.patches[k];
        for &i in &orders[k] {
            let c = shard.owner[p.faces[i]];
            send.extend_from_slice(&data[c * stride..(c + 1) * stride]);
        }
        send_counts[r] = p.len() * stride;
    }
    let plan = ExchangePlan::from_send_counts(send_counts, comm)?;
    if plan.recv_counts() != plan.send_counts() {
        return Err(MeshError::BufferMismatch {
            context: "halo patch sizes",
            expected: plan.send_counts().iter().sum(),
            actual: plan.total_recv(),
        });
    }
    let recv = plan.exchange(&send, comm)?;

    let mut out: Vec<Vec<T>> = shard
        .patches
        .iter()
        .map(|p| vec![T::zeroed(); p.len() * stride])
        .collect();
    for (r, k) in by_rank.iter().enumerate() {
        let Some(k) = *k else { continue };
        let chunk = &recv[plan.recv_range(r)];
        for (j, &i) in orders[k].iter().enumerate() {
            out[k][i * stride..(i + 1) * stride]
                .copy_from_slice(&chunk[j * stride..(j + 1) * stride]);
        }
    }
    Ok(out)
}
