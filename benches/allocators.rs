use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vkr_core::arena::{Arena, ArenaFlags};
use vkr_core::dmemory::DMemory;
use vkr_core::freelist::FreeList;
use vkr_core::tag::MemoryTag;

fn bench_freelist_allocate_free(c: &mut Criterion) {
    c.bench_function("freelist_allocate_free_4k", |b| {
        let mut list = FreeList::create(64 * 1024 * 1024, 256).unwrap();
        b.iter(|| {
            let offset = list.allocate(black_box(4096)).unwrap();
            list.free(4096, offset);
        });
    });
}

fn bench_arena_bump_alloc(c: &mut Criterion) {
    c.bench_function("arena_bump_alloc_256b", |b| {
        let mut arena = Arena::create(64 * 1024 * 1024, 1024 * 1024, ArenaFlags::default()).unwrap();
        b.iter(|| {
            let ptr = arena.alloc(black_box(256), MemoryTag::Struct);
            black_box(ptr);
            if arena.pos() > 32 * 1024 * 1024 {
                arena.reset(0, MemoryTag::Struct);
            }
        });
    });
}

fn bench_dmemory_alloc_free(c: &mut Criterion) {
    c.bench_function("dmemory_alloc_free_1k", |b| {
        let mut mem = DMemory::create(32 * 1024 * 1024, 128 * 1024 * 1024).unwrap();
        b.iter(|| {
            let ptr = mem.alloc(black_box(1024));
            mem.free(ptr, 1024, 16);
        });
    });
}

fn bench_dmemory_realloc(c: &mut Criterion) {
    c.bench_function("dmemory_realloc_grow", |b| {
        let mut mem = DMemory::create(32 * 1024 * 1024, 128 * 1024 * 1024).unwrap();
        b.iter(|| {
            let ptr = mem.alloc(black_box(256));
            let ptr = mem.realloc(ptr, 512, 16);
            mem.free(ptr, 512, 16);
        });
    });
}

criterion_group!(
    benches,
    bench_freelist_allocate_free,
    bench_arena_bump_alloc,
    bench_dmemory_alloc_free,
    bench_dmemory_realloc
);
criterion_main!(benches);
