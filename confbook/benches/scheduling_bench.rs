use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use confbook::config::SchedulerSettings;
use confbook::executor::{Executable, ExecutableId, ExecutionAction, ExecutionPlan};
use confbook::resource::{Capability, Resource, Technology};
use confbook::scheduler::{
    allocate_request, ReservationRequest, RoomSpecification, SchedulerContext, Specification,
};
use confbook::store::InMemoryStore;
use confbook::value::Pattern;
use confbook::{Interval, RequestId, ResourceId};

fn slot(hour: u32) -> Interval {
    let start = Utc.with_ymd_and_hms(2013, 1, 1, hour, 0, 0).unwrap();
    Interval::from_duration(start, Duration::hours(1)).unwrap()
}

fn bench_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("patterns");

    group.bench_function("parse", |b| {
        b.iter(|| Pattern::parse(black_box("950{digit:3}")));
    });

    let pattern = Pattern::parse("950{digit:3}").unwrap();
    group.bench_function("enumerate_1000", |b| {
        b.iter(|| black_box(&pattern).values().count());
    });

    group.bench_function("matches", |b| {
        b.iter(|| pattern.matches(black_box("950123")));
    });

    group.finish();
}

fn bench_intervals(c: &mut Criterion) {
    let mut group = c.benchmark_group("intervals");
    let a = slot(10);
    let b_slot = slot(10);

    group.bench_function("overlaps", |b| {
        b.iter(|| black_box(&a).overlaps(black_box(&b_slot)));
    });

    group.bench_function("intersection", |b| {
        b.iter(|| black_box(&a).intersection(black_box(&b_slot)));
    });

    group.finish();
}

fn bench_execution_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution_plan");

    for size in [10_u64, 100, 500] {
        // one chain: every executable depends on the next
        let executables: Vec<Executable> = (1..=size)
            .map(|id| {
                let executable = Executable::new(ExecutableId::from(id), slot(12));
                if id < size {
                    executable.with_child(ExecutableId::from(id + 1))
                } else {
                    executable
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("drain_chain", size), &executables, |b, executables| {
            b.iter(|| {
                let mut plan = ExecutionPlan::new();
                for executable in executables {
                    plan.add(ExecutionAction::start(executable)).unwrap();
                }
                plan.build().unwrap();
                while !plan.is_empty() {
                    for id in plan.pop_execution_actions().unwrap() {
                        plan.remove_execution_action(id).unwrap();
                    }
                }
                black_box(plan.completed_actions().len())
            });
        });
    }

    group.finish();
}

fn bench_room_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_allocation");

    for devices in [1_u64, 10, 50] {
        let store = (1..=devices).fold(InMemoryStore::new(), |store, id| {
            store.with_resource(
                Resource::new(ResourceId::from(id), format!("mcu-{id}"))
                    .with_technology(Technology::H323)
                    .with_capability(Capability::RoomProvider {
                        license_count: 20,
                        required_alias_types: vec![],
                    }),
            )
        });
        let request = ReservationRequest {
            id: RequestId::from(1),
            slot: slot(12),
            specification: Specification::Room(RoomSpecification {
                participant_count: 5,
                technology_variants: vec![[Technology::H323].into_iter().collect()],
                resource: None,
                aliases: vec![],
            }),
            reused_reservation: None,
        };
        let now = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();

        group.bench_with_input(BenchmarkId::new("devices", devices), &request, |b, request| {
            b.iter(|| {
                let mut context = SchedulerContext::new(&store, now, SchedulerSettings::default());
                allocate_request(&mut context, black_box(request)).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_patterns,
    bench_intervals,
    bench_execution_plan,
    bench_room_allocation
);
criterion_main!(benches);
