use std::collections::{HashMap, HashSet};

use devwatch::ledger::{BuildId, BuildLedger, BuildStatus};
use proptest::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
enum Op {
    Set(usize, BuildStatus),
    Clear(usize),
}

const POOL: usize = 4;

fn id_pool() -> Vec<BuildId> {
    (0..POOL).map(|i| BuildId::new(100 + i as i64, 7)).collect()
}

fn status_strategy() -> impl Strategy<Value = BuildStatus> {
    prop_oneof![
        Just(BuildStatus::Building),
        Just(BuildStatus::Failed),
        Just(BuildStatus::Aborted),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..POOL, status_strategy()).prop_map(|(i, s)| Op::Set(i, s)),
        (0..POOL).prop_map(Op::Clear),
    ]
}

proptest! {
    /// Whatever sequence of status writes and clears happens, the on-disk
    /// ledger stays equal to a trivial in-memory map: at most one record per
    /// id, each holding the last written status.
    #[test]
    fn ledger_tracks_the_last_write_per_build(
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let tmp = TempDir::new().unwrap();
        let ledger = BuildLedger::new(tmp.path().join("status"));
        let pool = id_pool();
        let mut model: HashMap<usize, BuildStatus> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(i, status) => {
                    ledger.set_status(&pool[i], status).unwrap();
                    model.insert(i, status);
                }
                Op::Clear(i) => {
                    ledger.clear(&pool[i]).unwrap();
                    model.remove(&i);
                }
            }
        }

        let records = ledger.list().unwrap();

        let mut seen = HashSet::new();
        for record in &records {
            prop_assert!(seen.insert(record.id), "duplicate record for {}", record.id);
        }

        let mut expected: Vec<(BuildId, BuildStatus)> =
            model.iter().map(|(&i, &s)| (pool[i], s)).collect();
        expected.sort_by_key(|(id, _)| *id);
        let actual: Vec<_> = records.iter().map(|r| (r.id, r.status)).collect();
        prop_assert_eq!(actual, expected);
    }

    /// Cleanup after a success removes exactly the terminal records that are
    /// not newer than the current build; building records always survive.
    #[test]
    fn cleanup_removes_only_superseded_terminal_records(
        ops in proptest::collection::vec(op_strategy(), 0..40),
        current in 0..POOL,
    ) {
        let tmp = TempDir::new().unwrap();
        let ledger = BuildLedger::new(tmp.path().join("status"));
        let pool = id_pool();

        for op in ops {
            match op {
                Op::Set(i, status) => ledger.set_status(&pool[i], status).unwrap(),
                Op::Clear(i) => ledger.clear(&pool[i]).unwrap(),
            }
        }

        let before = ledger.list().unwrap();
        let current = pool[current];
        ledger.cleanup_superseded(&current).unwrap();
        let after = ledger.list().unwrap();

        let survivors: Vec<_> = before
            .iter()
            .filter(|r| !(r.status.is_terminal() && r.timestamp() <= current.timestamp()))
            .copied()
            .collect();
        prop_assert_eq!(after, survivors);
    }
}
