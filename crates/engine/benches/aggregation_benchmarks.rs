use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use clubmetrics_core::{AmenityId, CustomerId, MembershipEnrollmentId, MembershipId, YearMonth};
use clubmetrics_engine::aggregator::aggregate;
use clubmetrics_engine::{
    CancellationToken, EngagementKey, EngineConfig, InMemoryReadModelStore, MonthlySummary, RecomputeEngine,
    RecomputeRequest, SummaryKey, UsageEngagement,
};
use clubmetrics_events::{InMemoryEventSource, UsageEvent};
use clubmetrics_reference::{
    Amenity, AmenityCostModel, CalendarDimension, InMemoryReferenceStore, MembershipEnrollment,
};

/// Reference data for `amenities` amenities and `members` enrollments.
fn club(amenities: usize, members: usize) -> (InMemoryReferenceStore, Vec<AmenityId>, Vec<MembershipEnrollmentId>) {
    let reference = InMemoryReferenceStore::new();
    reference.set_calendar(CalendarDimension::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
    ));

    let amenity_ids: Vec<_> = (0..amenities)
        .map(|i| {
            let id = AmenityId::new();
            reference.insert_amenity(Amenity::new(id, format!("amenity-{i}"), "bench"));
            let model = AmenityCostModel::new(
                Decimal::ZERO,
                Decimal::new(20000, 2),
                Decimal::new(300, 2),
                false,
                Decimal::new(400, 2),
            )
            .unwrap();
            reference.insert_cost_model(id, model);
            id
        })
        .collect();

    let member_ids: Vec<_> = (0..members)
        .map(|_| {
            let id = MembershipEnrollmentId::new();
            reference.insert_enrollment(MembershipEnrollment {
                membership_enrollment_id: id,
                customer_id: CustomerId::new(),
                membership_id: MembershipId::new(),
            });
            id
        })
        .collect();

    (reference, amenity_ids, member_ids)
}

fn usage(count: usize, amenities: &[AmenityId], members: &[MembershipEnrollmentId]) -> Vec<UsageEvent> {
    (0..count)
        .map(|i| {
            let month = (i % 12) as u32 + 1;
            let day = (i % 28) as u32 + 1;
            let at = Utc.with_ymd_and_hms(2026, month, day, (i % 24) as u32, 0, 0).unwrap();
            UsageEvent::new(members[i % members.len()], amenities[i % amenities.len()], at)
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let (reference, amenities, members) = club(12, 500);

    for size in [1_000usize, 10_000, 100_000].iter() {
        let events = usage(*size, &amenities, &members);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("events", size), &events, |b, events| {
            b.iter(|| black_box(aggregate(events, &reference).unwrap()));
        });
    }

    group.finish();
}

fn bench_recompute_year(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_year");
    group.sample_size(20);

    let (reference, amenities, members) = club(12, 500);
    let source = InMemoryEventSource::new();
    source.record_usage(usage(50_000, &amenities, &members)).unwrap();

    let request = RecomputeRequest::months(YearMonth::new(2026, 1).unwrap(), YearMonth::new(2026, 12).unwrap());
    let source = Arc::new(source);
    let reference = Arc::new(reference);

    for workers in [1usize, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
            let summaries: InMemoryReadModelStore<SummaryKey, MonthlySummary> = InMemoryReadModelStore::new();
            let engagement: InMemoryReadModelStore<EngagementKey, UsageEngagement> = InMemoryReadModelStore::new();
            let engine = RecomputeEngine::new(
                source.clone(),
                reference.clone(),
                summaries,
                engagement,
                EngineConfig::default().with_workers(workers),
            );
            b.iter(|| black_box(engine.run(&request, &CancellationToken::new()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_recompute_year);
criterion_main!(benches);
