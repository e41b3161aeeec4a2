//! British National Grid to WGS84 conversion
//!
//! Detail pages give locations as OSGB36 National Grid easting/northing
//! pairs. Converting to WGS84 latitude/longitude takes two steps:
//!
//! 1. Inverse transverse Mercator projection on the Airy 1830 ellipsoid,
//!    giving OSGB36 geodetic coordinates
//! 2. A seven-parameter Helmert transform from OSGB36 to WGS84 through
//!    earth-centred cartesian coordinates
//!
//! The Helmert step is accurate to a few metres, which is well within the
//! precision of a grid reference typed into a planning record.

/// An ellipsoid given by its semi-major and semi-minor axes, in metres
#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    fn eccentricity_squared(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.000,
    b: 6_356_752.3142,
};

// National Grid projection constants
const SCALE_FACTOR: f64 = 0.999_601_271_7;
const TRUE_ORIGIN_LAT_DEG: f64 = 49.0;
const TRUE_ORIGIN_LON_DEG: f64 = -2.0;
const FALSE_NORTHING: f64 = -100_000.0;
const FALSE_EASTING: f64 = 400_000.0;

// Extent of the National Grid, in metres
const GRID_MAX_EASTING: i64 = 700_000;
const GRID_MAX_NORTHING: i64 = 1_300_000;

const MAX_ARC_ITERATIONS: usize = 64;

// OSGB36 -> WGS84 Helmert parameters (metres, ppm, arcseconds)
const TX: f64 = 446.448;
const TY: f64 = -125.157;
const TZ: f64 = 542.060;
const SCALE_PPM: f64 = -20.4894;
const RX_SEC: f64 = 0.1502;
const RY_SEC: f64 = 0.2470;
const RZ_SEC: f64 = 0.8421;

/// A geodetic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// Converts a National Grid reference to WGS84 latitude and longitude
///
/// # Arguments
///
/// * `easting` - Metres east of the grid's false origin
/// * `northing` - Metres north of the grid's false origin
///
/// # Returns
///
/// `None` when the reference lies outside the National Grid
///
/// # Examples
///
/// ```
/// use northgate_harvest::geo::osgb36_to_wgs84;
///
/// let pos = osgb36_to_wgs84(526421, 170944).unwrap();
/// assert!((pos.latitude - 51.4234).abs() < 0.001);
/// assert!((pos.longitude + 0.1831).abs() < 0.001);
///
/// assert!(osgb36_to_wgs84(526421, 999_999_999_999).is_none());
/// ```
pub fn osgb36_to_wgs84(easting: i64, northing: i64) -> Option<LatLon> {
    if !(0..=GRID_MAX_EASTING).contains(&easting) || !(0..=GRID_MAX_NORTHING).contains(&northing)
    {
        return None;
    }

    let (lat, lon) = grid_to_osgb36(easting as f64, northing as f64)?;
    let (x, y, z) = geodetic_to_cartesian(lat, lon, AIRY_1830);
    let (x, y, z) = helmert_osgb36_to_wgs84(x, y, z);
    let (lat, lon) = cartesian_to_geodetic(x, y, z, WGS84);

    Some(LatLon {
        latitude: lat.to_degrees(),
        longitude: lon.to_degrees(),
    })
}

/// Meridional arc from the true origin latitude to `lat`, scaled by F0
fn meridional_arc(lat: f64, n: f64) -> f64 {
    let lat0 = TRUE_ORIGIN_LAT_DEG.to_radians();
    let (n2, n3) = (n * n, n * n * n);
    let d = lat - lat0;
    let s = lat + lat0;

    AIRY_1830.b
        * SCALE_FACTOR
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * d
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * d.sin() * s.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * d).sin() * (2.0 * s).cos()
            - (35.0 / 24.0) * n3 * (3.0 * d).sin() * (3.0 * s).cos())
}

/// Inverse transverse Mercator projection. Returns OSGB36 radians, or `None`
/// if the meridional arc does not converge.
fn grid_to_osgb36(easting: f64, northing: f64) -> Option<(f64, f64)> {
    let Ellipsoid { a, b } = AIRY_1830;
    let e2 = AIRY_1830.eccentricity_squared();
    let n = (a - b) / (a + b);
    let lat0 = TRUE_ORIGIN_LAT_DEG.to_radians();
    let lon0 = TRUE_ORIGIN_LON_DEG.to_radians();

    let mut lat = lat0;
    let mut m = 0.0;
    let mut converged = false;
    for _ in 0..MAX_ARC_ITERATIONS {
        lat += (northing - FALSE_NORTHING - m) / (a * SCALE_FACTOR);
        m = meridional_arc(lat, n);
        if (northing - FALSE_NORTHING - m).abs() < 1e-5 {
            converged = true;
            break;
        }
    }
    if !converged {
        return None;
    }

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let denom = 1.0 - e2 * sin_lat * sin_lat;
    let nu = a * SCALE_FACTOR / denom.sqrt();
    let rho = a * SCALE_FACTOR * (1.0 - e2) / denom.powf(1.5);
    let eta2 = nu / rho - 1.0;

    let tan = lat.tan();
    let (t2, t4, t6) = (tan * tan, tan.powi(4), tan.powi(6));
    let sec = 1.0 / cos_lat;
    let (nu3, nu5, nu7) = (nu.powi(3), nu.powi(5), nu.powi(7));

    let vii = tan / (2.0 * rho * nu);
    let viii = tan / (24.0 * rho * nu3) * (5.0 + 3.0 * t2 + eta2 - 9.0 * t2 * eta2);
    let ix = tan / (720.0 * rho * nu5) * (61.0 + 90.0 * t2 + 45.0 * t4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu3) * (nu / rho + 2.0 * t2);
    let xii = sec / (120.0 * nu5) * (5.0 + 28.0 * t2 + 24.0 * t4);
    let xiia = sec / (5040.0 * nu7) * (61.0 + 662.0 * t2 + 1320.0 * t4 + 720.0 * t6);

    let de = easting - FALSE_EASTING;
    let latitude = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let longitude = lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

    Some((latitude, longitude))
}

/// Geodetic radians (height zero) to earth-centred cartesian metres
fn geodetic_to_cartesian(lat: f64, lon: f64, ellipsoid: Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.eccentricity_squared();
    let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();

    (
        nu * lat.cos() * lon.cos(),
        nu * lat.cos() * lon.sin(),
        (1.0 - e2) * nu * lat.sin(),
    )
}

fn helmert_osgb36_to_wgs84(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let s = 1.0 + SCALE_PPM * 1e-6;
    let rx = (RX_SEC / 3600.0).to_radians();
    let ry = (RY_SEC / 3600.0).to_radians();
    let rz = (RZ_SEC / 3600.0).to_radians();

    (
        TX + s * x - rz * y + ry * z,
        TY + rz * x + s * y - rx * z,
        TZ - ry * x + rx * y + s * z,
    )
}

/// Earth-centred cartesian metres to geodetic radians
fn cartesian_to_geodetic(x: f64, y: f64, z: f64, ellipsoid: Ellipsoid) -> (f64, f64) {
    let e2 = ellipsoid.eccentricity_squared();
    let p = (x * x + y * y).sqrt();

    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..16 {
        let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let next = (z + e2 * nu * lat.sin()).atan2(p);
        let converged = (next - lat).abs() < 1e-12;
        lat = next;
        if converged {
            break;
        }
    }

    (lat, y.atan2(x))
}
