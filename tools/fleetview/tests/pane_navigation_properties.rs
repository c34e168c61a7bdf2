use fleetview::classifier::{classify, ClassifierPolicy};
use fleetview::cursor::{Navigation, SelectionCursor};
use fleetview::pane_store::PaneStore;
use fleetview::types::{Counters, Pane, WorkloadRecord, PANE_COUNT};

fn record(id: &str) -> WorkloadRecord {
    WorkloadRecord::new(id, Counters::default())
}

fn records(count: usize) -> Vec<WorkloadRecord> {
    (0..count).map(|i| record(&format!("r{i:03}"))).collect()
}

fn panes(page_size: usize, staged: Vec<WorkloadRecord>) -> [PaneStore; PANE_COUNT] {
    let mut panes = [
        PaneStore::new(page_size),
        PaneStore::new(page_size),
        PaneStore::new(page_size),
    ];
    panes[Pane::Staged.index()].replace(staged);
    panes
}

#[test]
fn five_records_page_size_two_pages_forward_and_stops() {
    let mut store = PaneStore::new(2);
    store.replace(["A", "B", "C", "D", "E"].iter().map(|id| record(id)).collect());
    let page = |s: &PaneStore| s.current_page().iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(page(&store), vec!["A", "B"]);
    store.next_page();
    assert_eq!(page(&store), vec!["C", "D"]);
    store.next_page();
    assert_eq!(page(&store), vec!["E"]);
    store.next_page();
    assert_eq!(page(&store), vec!["E"]);
}

#[test]
fn shrink_below_page_start_yields_last_valid_page() {
    for page_size in 1..6usize {
        for len in 1..30usize {
            let mut store = PaneStore::new(page_size);
            store.replace(records(30));
            while store.next_page() {}
            store.replace(records(len));
            let page = store.current_page();
            assert!(!page.is_empty(), "page_size={page_size} len={len}");
            assert_eq!(store.page_index(), len.div_ceil(page_size) - 1);
            assert_eq!(page.last().map(|r| r.id.clone()), Some(format!("r{:03}", len - 1)));
        }
    }
}

#[test]
fn move_down_visits_every_record_once_for_many_shapes() {
    for page_size in 1..7usize {
        for len in 1..20usize {
            let mut panes = panes(page_size, records(len));
            let mut cursor = SelectionCursor::default();
            let mut seen = vec![cursor.selected(&panes).map(|r| r.id.clone()).expect("first")];
            for _ in 0..len {
                cursor.apply(Navigation::MoveDown, &mut panes);
                let id = cursor.selected(&panes).map(|r| r.id.clone()).expect("selected");
                if seen.last() != Some(&id) {
                    seen.push(id);
                }
            }
            let expected = records(len).into_iter().map(|r| r.id).collect::<Vec<_>>();
            assert_eq!(seen, expected, "page_size={page_size} len={len}");
        }
    }
}

#[test]
fn move_up_walks_back_to_the_first_record() {
    let mut panes = panes(3, records(10));
    let mut cursor = SelectionCursor::default();
    for _ in 0..9 {
        cursor.move_down(&mut panes);
    }
    assert_eq!(cursor.selected(&panes).map(|r| r.id.as_str()), Some("r009"));
    for _ in 0..9 {
        cursor.move_up(&mut panes);
    }
    assert_eq!(cursor.selected(&panes).map(|r| r.id.as_str()), Some("r000"));
    let before = cursor;
    cursor.move_up(&mut panes);
    assert_eq!(cursor, before);
}

#[test]
fn switch_pane_full_cycle_returns_home() {
    let mut panes = panes(4, records(8));
    let mut cursor = SelectionCursor::default();
    for _ in 0..3 {
        cursor.move_down(&mut panes);
    }
    for round in 0..PANE_COUNT {
        cursor.switch_pane(&mut panes);
        assert_eq!(cursor.row_in_page(), 0, "round {round}");
    }
    assert_eq!(cursor.active_pane(), Pane::Staged);
}

#[test]
fn classify_counts_desired_instances_as_healthy() {
    let record = WorkloadRecord::new(
        "/svc",
        Counters {
            staged: 0,
            running: 3,
            healthy: 0,
            unhealthy: 0,
            desired_instances: 5,
        },
    );
    assert_eq!(classify(&record, ClassifierPolicy::default()), Some(Pane::RunningHealthy));
}
