use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hifitime::Unit;

use caldb::{
    sky::SkyCoord, time::epoch_from_mjd, Database, DatabaseParams, Entry, ObsType,
};

/// Catalog of `n` reference-signal entries spread over a few receivers and ten days
fn make_catalog(n: usize) -> Database {
    let receivers = ["MULTI", "H-OH", "10CM", "40CM"];
    let mut db = Database::new(DatabaseParams::default());
    for i in 0..n {
        let mut entry = Entry::for_type(ObsType::PolnCal, None);
        entry.filename = format!("cal_{i:05}.cf").into();
        entry.epoch = epoch_from_mjd(60000.0) + Unit::Minute * (i as f64 * 14400.0 / n as f64);
        entry.position = SkyCoord::new((i % 360) as f64, -30.0);
        entry.frequency = 1400.0;
        entry.bandwidth = 400.0;
        entry.nchan = 1024;
        entry.instrument = "PDFB4".into();
        entry.receiver = receivers[i % receivers.len()].into();
        // entries that collapse as duplicates only shrink the catalog
        let _ = db.add(entry);
    }
    db
}

fn bench_best_match(c: &mut Criterion) {
    for n in [1_000usize, 10_000] {
        let db = make_catalog(n);

        let mut target = Entry::for_type(ObsType::PolnCal, None);
        target.epoch = epoch_from_mjd(60005.0);
        target.position = SkyCoord::new(42.0, -30.0);
        target.frequency = 1400.0;
        target.bandwidth = 400.0;
        target.instrument = "PDFB4".into();
        target.receiver = "MULTI".into();

        let mut criteria = caldb::Criteria::new(target, db.params());
        criteria.checks.coordinates = false;

        c.bench_function(&format!("best_match/{n}_entries"), |b| {
            b.iter(|| black_box(db.best_match(black_box(&criteria))))
        });

        c.bench_function(&format!("all_matching/{n}_entries"), |b| {
            b.iter(|| black_box(db.all_matching(black_box(&criteria))))
        });
    }
}

criterion_group!(benches, bench_best_match);
criterion_main!(benches);
