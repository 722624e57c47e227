use std::f64::consts::PI;

/// Eccentricity of the WGS84 ellipsoid. The tile service uses the
/// ellipsoidal Mercator, not the spherical one.
const WGS84_ECCENTRICITY: f64 = 0.0818191908426;

/// Side of a square map tile in pixels
pub const TILE_SIZE: u32 = 256;

/// Max zoom level with tile indices that still fit into `u32`
pub const MAX_ZOOM: u8 = 22;

/// Location that is rendered with a marker on the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoMarker {
    pub lat: f64,
    pub lng: f64,
}

impl GeoMarker {
    /// Red Square, Moscow. Used when the location has no coordinates.
    pub const FALLBACK: Self = Self {
        lat: 55.7558,
        lng: 37.6173,
    };

    pub fn new(lat: f64, lng: f64) -> Self {
        if lat == 0.0 && lng == 0.0 {
            return Self::FALLBACK;
        }
        Self { lat, lng }
    }

    /// Global pixel coordinates of the marker at the zoom level
    pub fn project(self, zoom: u8) -> (f64, f64) {
        project(self.lat, self.lng, zoom)
    }
}

/// Ellipsoidal Web-Mercator projection of the coordinates into global pixel
/// coordinates at the given zoom level. Both tile selection and marker
/// placement must go through this function.
pub fn project(lat: f64, lng: f64, zoom: u8) -> (f64, f64) {
    let e = WGS84_ECCENTRICITY;

    let beta = lat.to_radians();
    let phi = (1.0 - e * beta.sin()) / (1.0 + e * beta.sin());
    let theta = (PI / 4.0 + beta / 2.0).tan() * phi.powf(e / 2.0);
    let rho = 2f64.powi(i32::from(zoom) + 8) / 2.0;

    let x = rho * (1.0 + lng / 180.0);
    let y = rho * (1.0 - theta.ln() / PI);

    (x, y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapTile {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl MapTile {
    pub fn containing(marker: GeoMarker, zoom: u8) -> Self {
        let (x, y) = marker.project(zoom);
        let max = (1u64 << zoom) - 1;

        let index = |pixel: f64| (pixel / f64::from(TILE_SIZE)).floor().clamp(0.0, max as f64) as u32;

        Self {
            zoom,
            x: index(x),
            y: index(y),
        }
    }

    /// Global pixel coordinates of the top-left corner of the tile
    pub fn origin(self) -> (f64, f64) {
        let size = f64::from(TILE_SIZE);
        (f64::from(self.x) * size, f64::from(self.y) * size)
    }

    /// Pixel position of the marker relative to the top-left corner of the tile
    pub fn offset_of(self, marker: GeoMarker) -> (f64, f64) {
        let (x, y) = marker.project(self.zoom);
        let (origin_x, origin_y) = self.origin();
        (x - origin_x, y - origin_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn equator_and_prime_meridian_are_in_the_center() {
        assert_eq!(project(0.0, 0.0, 0), (128.0, 128.0));
        assert_eq!(project(0.0, 0.0, 1), (256.0, 256.0));
    }

    #[test]
    fn known_tile() {
        let marker = GeoMarker::new(55.7558, 37.6173);
        let tile = MapTile::containing(marker, 15);

        expect!["MapTile { zoom: 15, x: 19808, y: 10272 }"].assert_eq(&format!("{tile:?}"));

        let (x, y) = tile.offset_of(marker);
        assert_eq!((x.floor(), y.floor()), (2.0, 67.0));
    }

    #[test]
    fn zero_coordinates_fall_back_to_default_location() {
        assert_eq!(GeoMarker::new(0.0, 0.0), GeoMarker::FALLBACK);
        assert_eq!(GeoMarker::new(0.0, 10.0).lng, 10.0);
    }

    #[test]
    fn marker_is_always_inside_of_its_tile() {
        let size = f64::from(TILE_SIZE);

        for zoom in 1..=18 {
            let mut lat = -84.9;
            while lat < 85.0 {
                let mut lng = -179.5;
                while lng < 180.0 {
                    let marker = GeoMarker { lat, lng };
                    let tile = MapTile::containing(marker, zoom);
                    let (x, y) = tile.offset_of(marker);

                    assert!(
                        (0.0..size).contains(&x) && (0.0..size).contains(&y),
                        "zoom: {zoom}, lat: {lat}, lng: {lng}, tile: {tile:?}, offset: {x}, {y}"
                    );
                    assert!(u64::from(tile.x) < 1 << zoom);
                    assert!(u64::from(tile.y) < 1 << zoom);

                    lng += 7.3;
                }
                lat += 3.7;
            }
        }
    }
}
