use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trainplan::zones::TimelinePoint;
use trainplan::{
    build_timeline, calculate_combined_metrics, EffortType, PowerProfile, PowerSeriesSampler, TimeBucketer,
    TssCalculator, WorkoutMetrics, WorkoutSelection, WorkoutTrace, ZoneClassifier,
};

/// Performance benchmarks for the planning pipeline
///
/// Workouts range from short sessions to long rides so that sampling and
/// the NP rolling window are measured at realistic sizes.

fn create_benchmark_profile() -> PowerProfile {
    PowerProfile::new(250.0, 1000.0, 500.0, 350.0)
}

/// Interval workout: alternating 5-minute blocks with a sprint every block
fn create_interval_trace(minutes: usize) -> WorkoutTrace {
    let mut time = vec![0.0];
    let mut value = Vec::new();
    let mut effort = Vec::new();

    for block in 0..minutes / 5 {
        let start = (block * 300) as f64;
        time.push(start + 15.0);
        value.push(1.0);
        effort.push(EffortType::Nm);

        time.push(start + 300.0);
        value.push(if block % 2 == 0 { 0.6 } else { 0.95 });
        effort.push(EffortType::Ftp);
    }

    WorkoutTrace::new(time, value, effort)
}

fn bench_sampling(c: &mut Criterion) {
    let profile = create_benchmark_profile();
    let sampler = PowerSeriesSampler::default();
    let mut group = c.benchmark_group("Power Series Sampling");

    for &minutes in &[30, 90, 240] {
        let trace = create_interval_trace(minutes);
        group.throughput(Throughput::Elements((minutes * 60) as u64));
        group.bench_with_input(BenchmarkId::new("sample", minutes), &trace, |b, trace| {
            b.iter(|| sampler.sample(black_box(trace), Some(&profile)));
        });
    }

    group.finish();
}

fn bench_normalized_power(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalized Power");

    for &seconds in &[1800usize, 5400, 14400] {
        let power: Vec<f64> = (0..seconds).map(|i| 150.0 + ((i / 60) % 5) as f64 * 40.0).collect();
        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(BenchmarkId::new("calculate_normalized_power", seconds), &power, |b, power| {
            b.iter(|| TssCalculator::calculate_normalized_power(black_box(power)));
        });
    }

    group.finish();
}

fn bench_scenario_metrics(c: &mut Criterion) {
    let profile = create_benchmark_profile();
    let calculator = TssCalculator::new();
    let traces: Vec<Option<WorkoutTrace>> = (0..10).map(|i| Some(create_interval_trace(30 + i * 15))).collect();

    c.bench_function("calculate_batch_10_workouts", |b| {
        b.iter(|| calculator.calculate_batch(black_box(&traces), &profile));
    });

    let selections: Vec<WorkoutSelection> = (0..10)
        .map(|i| {
            WorkoutSelection::new(
                format!("w{}", i),
                Some(WorkoutMetrics {
                    duration: 3600.0,
                    normalized_power: 200.0 + i as f64,
                    intensity_factor: 0.8,
                    training_stress_score: 64.0,
                }),
            )
        })
        .collect();

    c.bench_function("calculate_combined_metrics", |b| {
        b.iter(|| calculate_combined_metrics(black_box(&selections)));
    });
}

fn bench_zones_and_timeline(c: &mut Criterion) {
    let traces: Vec<WorkoutTrace> = (0..10).map(|i| create_interval_trace(60 + i * 10)).collect();
    let classifier = ZoneClassifier::new(85.0);

    c.bench_function("classify_traces", |b| {
        b.iter(|| classifier.classify_traces(black_box(&traces)));
    });

    let points: Vec<TimelinePoint> = build_timeline(&traces, classifier.scale());
    let bucketer = TimeBucketer::default();

    c.bench_function("bucket_timeline", |b| {
        b.iter(|| bucketer.buckets(black_box(&points)).count());
    });
}

criterion_group!(
    benches,
    bench_sampling,
    bench_normalized_power,
    bench_scenario_metrics,
    bench_zones_and_timeline
);
criterion_main!(benches);
