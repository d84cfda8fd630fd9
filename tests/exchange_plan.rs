use mesh_rebalance::algs::communicator::{Communicator, run_local};
use mesh_rebalance::algs::exchange::{ExchangePlan, sort_by_destination};
use mesh_rebalance::debug_invariants::DebugInvariants;

/// Item `i` of rank `r` is `100 * r + i`, sent to rank `(r + i) % n`.
#[test]
fn receive_side_is_grouped_by_source_then_send_order() {
    let n = 4;
    let out = run_local(n, |comm| {
        let me = comm.rank();
        let items: Vec<u64> = (0..6).map(|i| 100 * me as u64 + i).collect();
        let dest: Vec<usize> = (0..6).map(|i| (me + i) % n).collect();
        let plan = ExchangePlan::from_destinations(&dest, &comm).unwrap();
        plan.validate_invariants().unwrap();
        let order = sort_by_destination(&dest);
        let send: Vec<u64> = order.iter().map(|&i| items[i]).collect();
        (plan.recv_sources(), plan.exchange(&send, &comm).unwrap())
    });
    for (me, (sources, got)) in out.iter().enumerate() {
        let want: Vec<u64> = (0..n)
            .flat_map(|src| (0..6u64).filter(move |&i| (src + i as usize) % n == me).map(move |i| 100 * src as u64 + i))
            .collect();
        assert_eq!(got, &want);
        assert!(sources.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn variable_length_rows_use_a_strided_plan() {
    // rank r sends r + 1 rows to every rank, row j holding j + 1 copies of r
    let out = run_local(3, |comm| {
        let me = comm.rank();
        let n = comm.size();
        let dest: Vec<usize> = (0..n).flat_map(|d| std::iter::repeat_n(d, me + 1)).collect();
        let rows = ExchangePlan::from_destinations(&dest, &comm).unwrap();
        let send_strides: Vec<usize> = dest.iter().enumerate().map(|(k, _)| k % (me + 1) + 1).collect();
        let recv_strides = rows.exchange_counts(&send_strides, &comm).unwrap();
        let data: Vec<u64> = send_strides
            .iter()
            .flat_map(|&s| std::iter::repeat_n(me as u64, s))
            .collect();
        let values = rows
            .with_strides(&send_strides, &recv_strides)
            .unwrap()
            .exchange_ids(&data, &comm)
            .unwrap();
        (recv_strides, values)
    });
    for (strides, values) in out {
        assert_eq!(strides, vec![1, 1, 2, 1, 2, 3]);
        assert_eq!(values, vec![0, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
    }
}

#[test]
fn reversed_plan_answers_requests() {
    let out = run_local(2, |comm| {
        let me = comm.rank() as u64;
        // ask the other rank for two ids
        let other = 1 - comm.rank();
        let ask = ExchangePlan::from_destinations(&[other, other], &comm).unwrap();
        let asked = ask.exchange_ids(&[10 * me, 10 * me + 1], &comm).unwrap();
        let answers: Vec<u64> = asked.iter().map(|g| g + 1000 * me).collect();
        ask.reversed().exchange_ids(&answers, &comm).unwrap()
    });
    assert_eq!(out[0], vec![1000, 1001]);
    assert_eq!(out[1], vec![10, 11]);
}
