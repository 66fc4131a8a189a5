use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use hayago_core::{
    Coordinate, DriverRecord, Error, HeadlessViewport, MapConfig, MapOverlay,
    geometry::{parse_route_geometry, route_to_geojson_string},
    services::NearbyDriverLookup,
};

struct NoDrivers;

impl NearbyDriverLookup for NoDrivers {
    fn find_nearby(
        &self,
        _center: Coordinate,
        _radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<DriverRecord>, Error>> {
        future::ready(Ok(Vec::new())).boxed()
    }
}

fn sample_route(points: usize) -> Vec<Coordinate> {
    (0..points)
        .filter_map(|i| {
            let step = i as f64 / points as f64;
            Coordinate::new(37.70 + step * 0.1, -122.50 + step * 0.1).ok()
        })
        .collect()
}

fn sample_drivers(count: usize) -> Vec<DriverRecord> {
    (0..count)
        .filter_map(|i| {
            let offset = (i % 100) as f64 * 0.001;
            Coordinate::new(37.77 + offset, -122.42 - offset)
                .ok()
                .map(|c| DriverRecord::new(format!("DRV-{i}"), c))
        })
        .collect()
}

fn bench_route_parsing(c: &mut Criterion) {
    let Ok(text) = route_to_geojson_string(&sample_route(2_000)) else {
        return;
    };
    c.bench_function("parse_route_geometry_2000", |b| {
        b.iter(|| parse_route_geometry(black_box(&text)));
    });
}

fn bench_driver_rebuild(c: &mut Criterion) {
    let overlay = MapOverlay::new(
        HeadlessViewport::default(),
        MapConfig::default(),
        Arc::new(NoDrivers),
    );
    let drivers = sample_drivers(500);
    c.bench_function("replace_drivers_500", |b| {
        b.iter(|| overlay.replace_drivers(black_box(drivers.clone())));
    });
}

criterion_group!(benches, bench_route_parsing, bench_driver_rebuild);
criterion_main!(benches);
