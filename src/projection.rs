//! Projected-grid to geographic coordinate conversion.
//!
//! Reprojection is modelled as a [`Projector`] capability so the coordinate
//! resolver can run with or without one. [`KkjToWgs84`] converts the Finnish
//! KKJ Uniform Coordinate System (EPSG:2393) to WGS84 (EPSG:4326):
//!
//! 1. inverse transverse Mercator on the International 1924 ellipsoid
//!    (central meridian 27°E, scale 1, false easting 3 500 000 m);
//! 2. geodetic → geocentric on the same ellipsoid;
//! 3. seven-parameter Helmert shift (position-vector convention);
//! 4. geocentric → geodetic on WGS84.

/// Converts a projected `(easting, northing)` to `(longitude, latitude)` in
/// degrees. `None` means the point could not be transformed.
pub trait Projector {
    fn project(&self, easting: f64, northing: f64) -> Option<(f64, f64)>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    inverse_flattening: f64,
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        let f = 1.0 / self.inverse_flattening;
        2.0 * f - f * f
    }
}

const INTERNATIONAL_1924: Ellipsoid = Ellipsoid {
    a: 6_378_388.0,
    inverse_flattening: 297.0,
};

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    inverse_flattening: 298.257_223_563,
};

/// Helmert parameters: translations in metres, rotations in arc-seconds and
/// scale in parts per million.
#[derive(Debug, Clone, Copy)]
struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    rx: f64,
    ry: f64,
    rz: f64,
    ppm: f64,
}

const KKJ_TO_WGS84_SHIFT: Helmert = Helmert {
    tx: -96.062,
    ty: -82.428,
    tz: -121.753,
    rx: 4.801,
    ry: 0.345,
    rz: -1.376,
    ppm: 1.496,
};

const ARC_SECOND: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// EPSG:2393 → EPSG:4326.
#[derive(Debug, Clone, Copy, Default)]
pub struct KkjToWgs84;

impl KkjToWgs84 {
    const CENTRAL_MERIDIAN: f64 = 27.0;
    const FALSE_EASTING: f64 = 3_500_000.0;
    const SCALE: f64 = 1.0;
}

impl Projector for KkjToWgs84 {
    fn project(&self, easting: f64, northing: f64) -> Option<(f64, f64)> {
        if !easting.is_finite() || !northing.is_finite() {
            return None;
        }
        let (lat, lon) = inverse_transverse_mercator(
            &INTERNATIONAL_1924,
            easting - Self::FALSE_EASTING,
            northing,
            Self::CENTRAL_MERIDIAN.to_radians(),
            Self::SCALE,
        );
        let xyz = geodetic_to_geocentric(&INTERNATIONAL_1924, lat, lon);
        let shifted = helmert(&KKJ_TO_WGS84_SHIFT, xyz);
        let (lat, lon) = geocentric_to_geodetic(&WGS84, shifted);
        let (lon, lat) = (lon.to_degrees(), lat.to_degrees());
        if lon.is_finite() && lat.is_finite() {
            Some((lon, lat))
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "EPSG:2393 -> EPSG:4326"
    }
}

/// Returns `(latitude, longitude)` in radians for grid offsets `x` (from the
/// central meridian) and `y` (from the equator).
fn inverse_transverse_mercator(
    ellipsoid: &Ellipsoid,
    x: f64,
    y: f64,
    central_meridian: f64,
    k0: f64,
) -> (f64, f64) {
    let a = ellipsoid.a;
    let e2 = ellipsoid.e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let m = y / k0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let root = (1.0 - e2).sqrt();
    let e1 = (1.0 - root) / (1.0 + root);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = sin1 / cos1;
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - e2 * sin1 * sin1;
    let n1 = a / w.sqrt();
    let r1 = a * (1.0 - e2) / w.powf(1.5);
    let d = x / (n1 * k0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = central_meridian
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;
    (lat, lon)
}

fn geodetic_to_geocentric(ellipsoid: &Ellipsoid, lat: f64, lon: f64) -> [f64; 3] {
    let e2 = ellipsoid.e2();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    [
        n * cos_lat * cos_lon,
        n * cos_lat * sin_lon,
        n * (1.0 - e2) * sin_lat,
    ]
}

fn helmert(params: &Helmert, [x, y, z]: [f64; 3]) -> [f64; 3] {
    let rx = params.rx * ARC_SECOND;
    let ry = params.ry * ARC_SECOND;
    let rz = params.rz * ARC_SECOND;
    let scale = 1.0 + params.ppm * 1e-6;
    [
        params.tx + scale * (x - rz * y + ry * z),
        params.ty + scale * (rz * x + y - rx * z),
        params.tz + scale * (-ry * x + rx * y + z),
    ]
}

/// Returns `(latitude, longitude)` in radians.
fn geocentric_to_geodetic(ellipsoid: &Ellipsoid, [x, y, z]: [f64; 3]) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = x.hypot(y);
    let lon = y.atan2(x);
    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let n = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let h = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - e2 * n / (n + h)));
    }
    (lat, lon)
}
