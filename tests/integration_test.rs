// Integration tests for txmap
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use txmap_api::{Explorer, GraphDataService, NewNode, Outcome, QueryParams, NO_DATA_NOTICE};
use txmap_core::{
    make_address_node, make_edge, make_transaction_node, normalize_btc, AddressInfo, AddressMap,
    AddressMapEntry, AddressRecord, Amount, DenylistDetail, DenylistResponse, Direction, Edge,
    Error, GraphPayload, GraphStore, Hop, LayoutConfig, LayoutEngine, Network, NetworkFamily, Node,
    NodePatch, OccupancyGrid, Position, RelationType, Result, StoreConfig, TransactionDetail,
    TransactionMap, TransactionMapEntry, TransactionRecord,
};
use txmap_storage::{TabManager, TabManagerConfig};

fn address(id: &str, mother: Option<&str>, at: (i64, i64)) -> Node {
    make_address_node(id, true, mother, Network::Eth, &AddressInfo::default())
        .with_position(Position::new(at.0, at.1))
}

fn link(from: &str, to: &str) -> Edge {
    make_edge(format!("{}-{}", from, to), from, to, Amount::from(1), None, Network::Eth)
}

fn state(store: &GraphStore) -> (Vec<Node>, Vec<Edge>, OccupancyGrid) {
    (store.nodes().to_vec(), store.edges().to_vec(), store.occupied().clone())
}

fn assert_consistent(store: &GraphStore) {
    let positions: Vec<Position> = store.nodes().iter().filter_map(|n| n.position).collect();
    let unique: HashSet<Position> = positions.iter().copied().collect();
    assert_eq!(unique.len(), positions.len(), "two nodes share a cell");
    assert_eq!(store.occupied(), &store.derived_occupancy());
}

fn chain_store() -> GraphStore {
    let mut a = address("A", None, (0, 0));
    a.add_child("B");
    let mut b = address("B", Some("A"), (200, 0));
    b.add_child("C");
    let c = address("C", Some("B"), (400, 0));
    let mut store = GraphStore::new(StoreConfig::default());
    store.add_nodes(vec![a, b, c]);
    store
}

#[test]
fn test_positions_stay_unique_and_tracked() {
    let mut store = chain_store();
    assert_consistent(&store);

    store.update_nodes(vec![("C".to_string(), NodePatch::position(Position::new(200, 100)))]);
    assert_consistent(&store);

    store.begin_drag("B").unwrap();
    let dropped = store.end_drag("B", 210.0, 95.0, &LayoutConfig::default()).unwrap();
    assert_ne!(dropped, Position::new(200, 100));
    assert_consistent(&store);

    store.remove_nodes_recursively("B");
    assert_consistent(&store);
    assert_eq!(store.occupied().len(), 1);
}

#[test]
fn test_undo_redo_round_trip() {
    let mut store = GraphStore::new(StoreConfig::default());
    let before = state(&store);

    let mut a = address("A", None, (0, 0));
    a.add_child("B");
    let mut b = address("B", Some("A"), (200, 0));
    b.add_child("C");
    store.add_nodes(vec![a, b, address("C", Some("B"), (400, 0))]);
    store.add_edges(vec![link("A", "B"), link("B", "C")]);
    store.update_nodes(vec![("B".to_string(), NodePatch::position(Position::new(200, 100)))]);
    store.begin_drag("C").unwrap();
    store.end_drag("C", 600.0, 0.0, &LayoutConfig::default()).unwrap();
    store.remove_nodes_recursively("B");
    let after = state(&store);
    assert_eq!(store.history().len(), 5);

    for _ in 0..5 {
        assert!(store.undo());
    }
    assert!(!store.undo());
    assert_eq!(state(&store), before);

    for _ in 0..5 {
        assert!(store.redo());
    }
    assert!(!store.redo());
    assert_eq!(state(&store), after);
}

#[test]
fn test_add_nodes_is_idempotent() {
    let mut once = GraphStore::new(StoreConfig::default());
    once.add_nodes(vec![address("A", None, (0, 0))]);

    let mut twice = GraphStore::new(StoreConfig::default());
    twice.add_nodes(vec![address("A", None, (0, 0))]);
    assert_eq!(twice.add_nodes(vec![address("A", None, (0, 0))]), 0);

    assert_eq!(state(&once), state(&twice));
    assert_eq!(twice.history().len(), 1);
}

#[test]
fn test_recursive_deletion_closure() {
    let mut store = chain_store();
    store.add_nodes(vec![address("D", None, (0, 300))]);
    store.add_edges(vec![link("A", "B"), link("B", "C"), link("C", "D")]);

    let mut removed = store.remove_nodes_recursively("A");
    removed.sort();
    assert_eq!(removed, vec!["A", "B", "C"]);
    assert_eq!(store.nodes().len(), 1);
    assert!(store.edges().is_empty());
    assert!(store.occupied().is_free(0, 0));
    assert!(store.occupied().is_free(200, 0));
    assert!(store.occupied().is_free(400, 0));
    assert!(!store.occupied().is_free(0, 300));
}

#[test]
fn test_btc_main_edge_accumulates() {
    let entry = |related: &str, mother: i64| TransactionMapEntry {
        transaction: Some(TransactionRecord {
            tx_id: Some("t1".to_string()),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }),
        address: Some(AddressRecord {
            addr: Some(related.to_string()),
            ..Default::default()
        }),
        mother_value: Some(Amount::from(mother)),
        child_value: Some(Amount::from(mother)),
    };
    let graph = normalize_btc(
        "main",
        &AddressInfo::default(),
        &[entry("r1", 5), entry("r2", 3)],
        Direction::All,
    );

    let main_edges: Vec<&Edge> = graph
        .edges()
        .iter()
        .filter(|e| e.source == "main" && e.target == "t1")
        .collect();
    assert_eq!(main_edges.len(), 1);
    assert_eq!(main_edges[0].value, Amount::from(8));
}

#[test]
fn test_balanced_sibling_placement() {
    let mother = address("M", None, (0, 0));
    let siblings: Vec<Node> = ["s1", "s2", "s3"]
        .iter()
        .map(|id| make_address_node(id, true, Some("M"), Network::Eth, &AddressInfo::default()))
        .collect();
    let engine = LayoutEngine::new(LayoutConfig {
        horizontal_gap: 200,
        vertical_gap: 80,
    });
    let mut grid = OccupancyGrid::new();
    let placed = engine.layout(siblings, &mother, &mut grid);

    let positions: Vec<Position> = placed.iter().filter_map(|n| n.position).collect();
    assert_eq!(
        positions,
        vec![Position::new(200, 0), Position::new(200, 80), Position::new(200, -80)]
    );
    for position in &positions {
        assert!(grid.is_occupied(position));
    }
}

#[test]
fn test_new_edit_discards_redo() {
    let mut store = GraphStore::new(StoreConfig::default());
    store.add_nodes(vec![address("op1", None, (0, 0))]);
    store.add_nodes(vec![address("op2", None, (0, 100))]);
    store.add_nodes(vec![address("op3", None, (0, 200))]);
    assert!(store.undo());
    store.add_nodes(vec![address("op4", None, (0, 300))]);

    assert!(!store.redo());
    assert!(!store.contains_node("op3"));
    assert!(store.occupied().is_free(0, 200));
    assert_eq!(store.history().pointer(), 2);
}

#[test]
fn test_transaction_nodes_share_history_with_edges() {
    let mut store = chain_store();
    let tx = make_transaction_node("tx", true, Some(1), Amount::from(2), None, vec![], Some("C"))
        .with_position(Position::new(600, 0));
    store.merge("attach", vec![tx], vec![link("C", "tx")]);
    assert_eq!(store.edges().len(), 1);

    assert!(store.undo());
    assert!(!store.contains_node("tx"));
    assert!(store.edges().is_empty());
    assert_consistent(&store);
}

// Explorer against an in-memory graph data service.

#[derive(Default)]
struct MockService {
    maps: HashMap<String, Vec<AddressMapEntry>>,
    utxo: HashMap<String, Vec<TransactionMapEntry>>,
    denylist: HashMap<String, DenylistResponse>,
    failing: AtomicBool,
}

impl MockService {
    fn with_map(mut self, address: &str, entries: Vec<AddressMapEntry>) -> Self {
        self.maps.insert(address.to_string(), entries);
        self
    }

    fn with_utxo(mut self, address: &str, entries: Vec<TransactionMapEntry>) -> Self {
        self.utxo.insert(address.to_string(), entries);
        self
    }

    fn with_denylist(mut self, address: &str, hops: Vec<Hop>) -> Self {
        self.denylist.insert(
            address.to_string(),
            DenylistResponse {
                rsp_code: Some("0000".to_string()),
                is_denylist: Some("Y".to_string()),
                denylist_detail: Some(DenylistDetail {
                    source_details: hops,
                    ..Default::default()
                }),
            },
        );
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Service("backend returned 503".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphDataService for MockService {
    async fn address_info(&self, _network: Network, _address: &str) -> Result<AddressInfo> {
        self.check()?;
        Ok(AddressInfo::default())
    }

    async fn transaction_map(&self, network: Network, address: &str, _params: &QueryParams) -> Result<GraphPayload> {
        self.check()?;
        Ok(match network.family() {
            NetworkFamily::Utxo => GraphPayload::Utxo(TransactionMap {
                transaction_list: self.utxo.get(address).cloned().unwrap_or_default(),
            }),
            NetworkFamily::Account => GraphPayload::Account(AddressMap {
                address_list: self.maps.get(address).cloned().unwrap_or_default(),
            }),
        })
    }

    async fn transaction_detail(&self, _network: Network, tx_id: &str) -> Result<TransactionDetail> {
        self.check()?;
        let address_list = self.maps.get(tx_id).cloned().unwrap_or_default();
        Ok(TransactionDetail {
            address_list,
            ..Default::default()
        })
    }

    async fn denylist_info(&self, address: &str) -> Result<DenylistResponse> {
        self.check()?;
        Ok(self.denylist.get(address).cloned().unwrap_or_default())
    }
}

fn relation(related: &str, tx: &str, kind: RelationType) -> AddressMapEntry {
    AddressMapEntry {
        address: Some(AddressRecord {
            addr: Some(related.to_string()),
            ..Default::default()
        }),
        transaction: Some(TransactionRecord {
            tx_id: Some(tx.to_string()),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }),
        relation_type: Some(kind),
        relation_value: Some(Amount::from(10)),
    }
}

fn utxo_flow(tx: &str, related: &str, mother: i64) -> TransactionMapEntry {
    TransactionMapEntry {
        transaction: Some(TransactionRecord {
            tx_id: Some(tx.to_string()),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }),
        address: Some(AddressRecord {
            addr: Some(related.to_string()),
            ..Default::default()
        }),
        mother_value: Some(Amount::from(mother)),
        child_value: Some(Amount::from(mother.abs())),
    }
}

fn explorer_with(service: MockService, config: TabManagerConfig) -> (Explorer, Arc<MockService>) {
    let service = Arc::new(service);
    let explorer = Explorer::new(
        service.clone(),
        Arc::new(TabManager::new(config)),
        LayoutConfig::default(),
    );
    (explorer, service)
}

fn neighbourhood() -> MockService {
    MockService::default()
        .with_map(
            "main",
            vec![
                relation("a", "t1", RelationType::Out),
                relation("b", "t2", RelationType::In),
            ],
        )
        .with_map(
            "a",
            vec![
                relation("main", "t1", RelationType::In),
                relation("c", "t3", RelationType::Out),
            ],
        )
}

fn position_of(explorer: &Explorer, tab: &str, node: &str) -> Option<Position> {
    let handle = explorer.tabs().get_tab(tab)?;
    let tab = handle.read();
    tab.store().node(node)?.position
}

fn node_count(explorer: &Explorer, tab: &str) -> usize {
    explorer
        .tabs()
        .get_tab(tab)
        .map_or(0, |handle| handle.read().store().nodes().len())
}

#[tokio::test]
async fn test_search_seeds_main_at_origin() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    let outcome = explorer.search(Network::Eth, "  main ", &QueryParams::default()).await.unwrap();

    let Outcome::Applied(report) = outcome else {
        panic!("expected an applied outcome");
    };
    assert_eq!(report.summary.nodes_added, 3);
    assert_eq!(report.summary.edges_added, 2);
    assert!(!report.denylisted);
    assert_eq!(report.net_flow.len(), 2);

    assert_eq!(position_of(&explorer, "main", "main"), Some(Position::ORIGIN));
    assert_eq!(position_of(&explorer, "main", "a"), Some(Position::new(200, 0)));
    assert_eq!(position_of(&explorer, "main", "b"), Some(Position::new(-200, 0)));
    assert_eq!(explorer.tabs().active_tab().as_deref(), Some("main"));
    assert_eq!(explorer.tabs().recent_searches(), vec!["main"]);

    let handle = explorer.tabs().get_tab("main").unwrap();
    assert_eq!(handle.read().store().history().len(), 1);
    assert_consistent(handle.read().store());
}

#[tokio::test]
async fn test_expand_filters_known_elements() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();

    let outcome = explorer.expand("main", "a", &QueryParams::default()).await.unwrap();
    let Outcome::Applied(report) = outcome else {
        panic!("expected an applied outcome");
    };
    assert_eq!(report.summary.nodes_added, 1);
    assert_eq!(report.summary.edges_added, 1);
    assert_eq!(position_of(&explorer, "main", "c"), Some(Position::new(400, 0)));

    let again = explorer.expand("main", "a", &QueryParams::default()).await.unwrap();
    assert_eq!(
        again,
        Outcome::NoData {
            notice: NO_DATA_NOTICE.to_string()
        }
    );
    assert_eq!(node_count(&explorer, "main"), 4);

    let handle = explorer.tabs().get_tab("main").unwrap();
    let tab = handle.read();
    let a = tab.store().node("a").unwrap();
    assert_eq!(a.child_nodes, vec!["c".to_string()]);
    assert_consistent(tab.store());
}

#[tokio::test]
async fn test_expansion_undoes_in_one_step() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();
    explorer.expand("main", "a", &QueryParams::default()).await.unwrap();

    assert!(explorer.undo("main").unwrap());
    assert_eq!(node_count(&explorer, "main"), 3);
    {
        let handle = explorer.tabs().get_tab("main").unwrap();
        let tab = handle.read();
        assert!(tab.store().node("a").unwrap().child_nodes.is_empty());
        assert_eq!(tab.store().edges().len(), 2);
        assert_consistent(tab.store());
    }

    assert!(explorer.redo("main").unwrap());
    assert_eq!(position_of(&explorer, "main", "c"), Some(Position::new(400, 0)));
}

#[tokio::test]
async fn test_stale_targets_are_ignored() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();

    let outcome = explorer.expand("main", "ghost", &QueryParams::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Stale);
    let outcome = explorer.expand("closed", "a", &QueryParams::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Stale);

    explorer.delete_node("main", "a").unwrap();
    let outcome = explorer.expand("main", "a", &QueryParams::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Stale);
}

#[tokio::test]
async fn test_service_failure_leaves_graph_untouched() {
    let (explorer, service) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();
    let before = state(explorer.tabs().get_tab("main").unwrap().read().store());

    service.failing.store(true, Ordering::SeqCst);
    let err = explorer.expand("main", "a", &QueryParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::Service(_)));

    let after = state(explorer.tabs().get_tab("main").unwrap().read().store());
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_denylist_trace_is_attached() {
    let hop = Hop {
        wallet_address: Some("victim".to_string()),
        tx_hash: Some("h1".to_string()),
        prev_address: Some("thief".to_string()),
        value: Some(Amount::from(-7)),
        ..Default::default()
    };
    let service = MockService::default().with_denylist("victim", vec![hop]);
    let (explorer, _) = explorer_with(service, TabManagerConfig::default());

    let outcome = explorer.search(Network::Trx, "victim", &QueryParams::default()).await.unwrap();
    let Outcome::Applied(report) = outcome else {
        panic!("expected an applied outcome");
    };
    assert!(report.denylisted);
    assert_eq!(report.hops_consumed, 1);
    assert_eq!(report.summary.edges_added, 2);
    assert_eq!(position_of(&explorer, "victim", "h1"), Some(Position::new(-200, 0)));
    assert_eq!(position_of(&explorer, "victim", "thief"), Some(Position::new(-400, 0)));
}

#[tokio::test]
async fn test_search_input_and_tab_limits() {
    let config = TabManagerConfig {
        max_tabs: 1,
        ..Default::default()
    };
    let (explorer, _) = explorer_with(neighbourhood(), config);

    let err = explorer.search(Network::Eth, "   ", &QueryParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let outcome = explorer.search(Network::Eth, "lonely", &QueryParams::default()).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::NoData {
            notice: NO_DATA_NOTICE.to_string()
        }
    );

    let err = explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::TabLimitReached(1)));
}

#[tokio::test]
async fn test_keyboard_undo_follows_active_tab() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();
    explorer.search(Network::Eth, "a", &QueryParams::default()).await.unwrap();
    assert_eq!(explorer.tabs().active_tab().as_deref(), Some("a"));

    assert!(explorer.undo_active());
    assert_eq!(node_count(&explorer, "a"), 0);
    assert_eq!(node_count(&explorer, "main"), 3);

    explorer.tabs().set_active("main").unwrap();
    assert!(explorer.undo_active());
    assert_eq!(node_count(&explorer, "main"), 0);
    assert!(!explorer.undo_active());
}

#[tokio::test]
async fn test_manual_add_and_drag() {
    let (explorer, _) = explorer_with(neighbourhood(), TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();

    let request = NewNode {
        address: "x".to_string(),
        is_right: true,
        info: AddressInfo::default(),
        value: Amount::from(3),
        timestamp: None,
    };
    let outcome = explorer.add_node("main", "a", request.clone()).unwrap();
    assert!(matches!(outcome, Outcome::Applied(_)));
    assert_eq!(position_of(&explorer, "main", "x"), Some(Position::new(400, 0)));

    let duplicate = explorer.add_node("main", "a", request).unwrap();
    assert!(matches!(duplicate, Outcome::NoData { .. }));

    let history_len = explorer.tabs().get_tab("main").unwrap().read().store().history().len();
    explorer.begin_drag("main", "x").unwrap();
    let same = explorer.end_drag("main", "x", 395.0, 10.0).unwrap();
    assert_eq!(same, Position::new(400, 0));
    assert_eq!(
        explorer.tabs().get_tab("main").unwrap().read().store().history().len(),
        history_len
    );

    explorer.begin_drag("main", "x").unwrap();
    assert!(explorer.cancel_drag("main").unwrap());
    let handle = explorer.tabs().get_tab("main").unwrap();
    assert!(handle.read().store().occupied().is_occupied(&Position::new(400, 0)));
}

#[tokio::test]
async fn test_transaction_detail_requires_addresses() {
    let service = neighbourhood().with_map("t9", vec![relation("a", "t9", RelationType::Out)]);
    let (explorer, _) = explorer_with(service, TabManagerConfig::default());
    explorer.search(Network::Eth, "main", &QueryParams::default()).await.unwrap();

    let detail = explorer.transaction_detail("main", "t9").await.unwrap();
    assert_eq!(detail.address_list.len(), 1);

    let err = explorer.transaction_detail("main", "missing").await.unwrap_err();
    assert!(matches!(err, Error::NoData(_)));
}

#[tokio::test]
async fn test_btc_search_expand_and_undo() {
    let service = MockService::default()
        .with_utxo("main", vec![utxo_flow("t1", "r1", 5), utxo_flow("t2", "l1", -3)])
        .with_utxo("r1", vec![utxo_flow("t1", "main", -5), utxo_flow("t3", "r3", 4)]);
    let (explorer, _) = explorer_with(service, TabManagerConfig::default());

    let outcome = explorer.search(Network::Btc, "main", &QueryParams::default()).await.unwrap();
    let Outcome::Applied(report) = outcome else {
        panic!("expected an applied outcome");
    };
    assert_eq!(report.summary.nodes_added, 5);
    assert_eq!(report.summary.edges_added, 4);
    assert!(report.net_flow.is_empty());
    assert_eq!(position_of(&explorer, "main", "main"), Some(Position::ORIGIN));
    assert_eq!(position_of(&explorer, "main", "t1"), Some(Position::new(200, 0)));
    assert_eq!(position_of(&explorer, "main", "r1"), Some(Position::new(400, 0)));
    assert_eq!(position_of(&explorer, "main", "t2"), Some(Position::new(-200, 0)));
    assert_eq!(position_of(&explorer, "main", "l1"), Some(Position::new(-400, 0)));
    let after_search = state(explorer.tabs().get_tab("main").unwrap().read().store());

    let outcome = explorer.expand("main", "r1", &QueryParams::default()).await.unwrap();
    let Outcome::Applied(report) = outcome else {
        panic!("expected an applied outcome");
    };
    assert_eq!(report.summary.nodes_added, 2);
    assert_eq!(position_of(&explorer, "main", "t3"), Some(Position::new(600, 0)));
    assert_eq!(position_of(&explorer, "main", "r3"), Some(Position::new(800, 0)));
    {
        let handle = explorer.tabs().get_tab("main").unwrap();
        let tab = handle.read();
        let store = tab.store();
        assert_eq!(store.nodes().len(), 7);
        let node_ids: HashSet<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids.len(), store.nodes().len());
        let edge_ids: HashSet<&str> = store.edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids.len(), store.edges().len());
        for edge in store.edges() {
            assert!(node_ids.contains(edge.source.as_str()) && node_ids.contains(edge.target.as_str()));
        }
        assert_eq!(store.node("r1").unwrap().child_nodes, vec!["t3".to_string()]);
        assert_eq!(store.node("t1").unwrap().child_nodes, vec!["r1".to_string()]);
        assert_eq!(
            store.node("main").unwrap().child_nodes,
            vec!["t1".to_string(), "t2".to_string()]
        );
        assert_consistent(store);
    }

    assert!(explorer.undo("main").unwrap());
    let handle = explorer.tabs().get_tab("main").unwrap();
    let store_state = state(handle.read().store());
    assert_eq!(store_state, after_search);
    assert!(handle.read().store().occupied().is_free(600, 0));
    assert_consistent(handle.read().store());
}
