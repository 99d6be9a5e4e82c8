use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use terrasat::propagation::Sgp4;
use terrasat::tle::OrbitalElementSet;
use terrasat::track::{sample_with, TrackParams};

fn element_sets() -> Vec<OrbitalElementSet> {
    [
        (
            "ISS (ZARYA)",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        ),
        (
            "MOLNIYA 2-14",
            "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813",
            "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656",
        ),
        (
            "XM-3",
            "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190",
            "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4352",
        ),
    ]
    .into_iter()
    .map(|(name, l1, l2)| OrbitalElementSet::from_lines(name, l1, l2).unwrap())
    .collect()
}

/// One propagation from an initialized model; resonant orbits integrate from epoch each call.
fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("sgp4/propagate_minutes");
    for set in element_sets() {
        let sgp4 = Sgp4::new(&set).unwrap();
        for tsince in [0.0, 1440.0, 10080.0] {
            group.bench_with_input(
                BenchmarkId::new(set.name.as_str(), tsince),
                &tsince,
                |b, &t| b.iter(|| sgp4.propagate_minutes(black_box(t))),
            );
        }
    }
    group.finish();
}

fn bench_initialize(c: &mut Criterion) {
    let sets = element_sets();
    c.bench_function("sgp4/initialize", |b| {
        b.iter(|| {
            for set in &sets {
                black_box(Sgp4::new(black_box(set)).ok());
            }
        })
    });
}

/// Full one-day track at the default 10 min step.
fn bench_track(c: &mut Criterion) {
    let params = TrackParams::default();
    let mut group = c.benchmark_group("track/one_day");
    for set in element_sets() {
        group.bench_function(set.name.as_str(), |b| {
            b.iter(|| sample_with(black_box(&set), set.epoch(), &params))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_propagate, bench_initialize, bench_track);
criterion_main!(benches);
