use criterion::{Criterion, black_box, criterion_group, criterion_main};

use stratum_core::layer::{LayerHandle, Path, fields};
use stratum_core::undo::edits::CreatePrim;
use stratum_core::undo::{CommandGroup, CommandStack, GroupRecorder, LayerEdit};

fn prim_paths(count: usize) -> Vec<Path> {
    (0..count)
        .map(|i| Path::new(&format!("/Prim{i}")).expect("valid path"))
        .collect()
}

fn record_prims(layer: &LayerHandle, paths: &[Path]) -> CommandGroup {
    let mut group = CommandGroup::new();
    {
        let _recorder = GroupRecorder::new(&mut group, &[layer.clone()]);
        let mut layer = layer.borrow_mut();
        for path in paths {
            layer.create_prim(path).expect("create prim");
            layer.set_field(path, fields::ACTIVE, Some(true.into()));
        }
    }
    group
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

fn bench_record_100_prims(c: &mut Criterion) {
    let paths = prim_paths(100);
    c.bench_function("record_100_prims", |b| {
        b.iter(|| {
            let layer = LayerHandle::create("bench");
            black_box(record_prims(&layer, black_box(&paths)))
        });
    });
}

fn bench_unrecorded_100_prims(c: &mut Criterion) {
    let paths = prim_paths(100);
    c.bench_function("unrecorded_100_prims", |b| {
        b.iter(|| {
            let layer = LayerHandle::create("bench");
            {
                let mut layer = layer.borrow_mut();
                for path in &paths {
                    layer.create_prim(path).expect("create prim");
                    layer.set_field(path, fields::ACTIVE, Some(true.into()));
                }
            }
            black_box(layer)
        });
    });
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

fn bench_group_revert_apply(c: &mut Criterion) {
    let layer = LayerHandle::create("bench");
    let group = record_prims(&layer, &prim_paths(100));
    c.bench_function("group_revert_apply_100_prims", |b| {
        b.iter(|| {
            group.revert();
            group.apply();
        });
    });
}

fn bench_stack_undo_redo(c: &mut Criterion) {
    let layer = LayerHandle::create("bench");
    let mut stack = CommandStack::unbounded();
    for path in prim_paths(100) {
        stack.execute(CreatePrim::new(&layer, path).into_command());
    }
    c.bench_function("stack_undo_redo_100_commands", |b| {
        b.iter(|| {
            while stack.undo() {}
            while stack.redo() {}
            black_box(stack.cursor())
        });
    });
}

criterion_group!(
    benches,
    bench_record_100_prims,
    bench_unrecorded_100_prims,
    bench_group_revert_apply,
    bench_stack_undo_redo,
);
criterion_main!(benches);
