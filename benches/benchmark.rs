// Layout and history benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use txmap_core::{
    make_address_node, make_edge, AddressInfo, Amount, Edge, GraphStore, LayoutConfig,
    LayoutEngine, Network, Node, OccupancyGrid, Position, StoreConfig,
};

fn anchor() -> Node {
    make_address_node("anchor", false, None, Network::Eth, &AddressInfo::default())
        .with_position(Position::ORIGIN)
}

fn siblings(count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| {
            make_address_node(
                &format!("addr{}", i),
                i % 2 == 0,
                Some("anchor"),
                Network::Eth,
                &AddressInfo::default(),
            )
        })
        .collect()
}

fn fan_out_edges(count: usize) -> Vec<Edge> {
    (0..count)
        .map(|i| {
            let target = format!("addr{}", i);
            make_edge(
                format!("anchor-{}", target),
                "anchor",
                &target,
                Amount::from(i as i64),
                None,
                Network::Eth,
            )
        })
        .collect()
}

fn benchmark_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let engine = LayoutEngine::new(LayoutConfig::default());
    let anchor = anchor();

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("balanced", size), size, |b, &size| {
            b.iter(|| {
                let mut grid = OccupancyGrid::new();
                black_box(engine.layout(siblings(size), &anchor, &mut grid))
            });
        });
    }

    group.finish();
}

fn benchmark_merge_undo(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_undo");
    let engine = LayoutEngine::new(LayoutConfig::default());
    let anchor = anchor();

    for size in [10, 100, 1000].iter() {
        let mut grid = OccupancyGrid::new();
        let mut nodes = vec![anchor.clone()];
        nodes.extend(engine.layout(siblings(*size), &anchor, &mut grid));
        let edges = fan_out_edges(*size);

        group.bench_with_input(BenchmarkId::new("expand_then_undo", size), size, |b, _| {
            b.iter(|| {
                let mut store = GraphStore::new(StoreConfig::default());
                store.merge("expand", nodes.clone(), edges.clone());
                black_box(store.undo());
                black_box(store.redo())
            });
        });
    }

    group.finish();
}

fn benchmark_drag(c: &mut Criterion) {
    let engine = LayoutEngine::new(LayoutConfig::default());
    let anchor = anchor();
    let mut grid = OccupancyGrid::new();
    let mut nodes = vec![anchor.clone()];
    nodes.extend(engine.layout(siblings(500), &anchor, &mut grid));

    let mut store = GraphStore::new(StoreConfig::default());
    store.add_nodes(nodes);
    let layout = LayoutConfig::default();
    let mut rng = rand::rng();

    c.bench_function("drag_drop_random", |b| {
        b.iter(|| {
            let id = format!("addr{}", rng.random_range(0..500));
            let x = rng.random_range(-2000.0..2000.0);
            let y = rng.random_range(-5000.0..5000.0);
            if store.begin_drag(&id).is_ok() {
                black_box(store.end_drag(&id, x, y, &layout).ok());
            }
        });
    });
}

criterion_group!(benches, benchmark_layout, benchmark_merge_undo, benchmark_drag);
criterion_main!(benches);
