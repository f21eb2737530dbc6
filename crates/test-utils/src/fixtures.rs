//! Common test fixtures for station explorer tests.
//!
//! Inventory text is written in the same fixed layout as the published
//! GHCN-Daily `ghcnd-inventory.txt`, so it goes through the real parser.

/// Viewport corners for testing, as `[lon, lat]` pairs in the order the map
/// reports them (top-left, top-right, bottom-right, bottom-left).
pub mod corners {
    /// Roughly the continental United States.
    pub const CONUS: [[f64; 2]; 4] = [
        [-130.0, 55.0],
        [-60.0, 55.0],
        [-60.0, 20.0],
        [-130.0, 20.0],
    ];

    /// Kansas and Missouri.
    pub const MIDWEST: [[f64; 2]; 4] = [
        [-102.0, 41.0],
        [-89.0, 41.0],
        [-89.0, 36.0],
        [-102.0, 36.0],
    ];

    /// A view rotated by the map bearing: the corners are not axis aligned,
    /// only their envelope is.
    pub const ROTATED: [[f64; 2]; 4] = [
        [-100.0, 42.0],
        [-88.0, 40.0],
        [-90.0, 34.0],
        [-102.0, 36.0],
    ];
}

/// A small inventory covering a handful of US stations and one overseas
/// station.
///
/// | station     | where          | measures                   |
/// |-------------|----------------|----------------------------|
/// | USW00003947 | Kansas City MO | TMAX TMIN PRCP SNOW SNWD   |
/// | USW00013996 | Topeka KS      | TMAX TMIN PRCP             |
/// | USC00144972 | Lawrence KS    | PRCP SNOW                  |
/// | USW00024233 | Seattle WA     | TMAX PRCP                  |
/// | ASN00086071 | Melbourne AU   | TMAX PRCP                  |
pub const SAMPLE_INVENTORY: &str = "\
USW00003947  39.2972  -94.7306 TMAX 1972 2024
USW00003947  39.2972  -94.7306 TMIN 1972 2024
USW00003947  39.2972  -94.7306 PRCP 1972 2024
USW00003947  39.2972  -94.7306 SNOW 1972 2024
USW00003947  39.2972  -94.7306 SNWD 1980 2024
USW00013996  39.0725  -95.6261 TMAX 1946 2024
USW00013996  39.0725  -95.6261 TMIN 1946 2024
USW00013996  39.0725  -95.6261 PRCP 1946 2024
USC00144972  38.9581  -95.2517 PRCP 1868 2024
USC00144972  38.9581  -95.2517 SNOW 1890 2001
USW00024233  47.4444 -122.3139 TMAX 1948 2024
USW00024233  47.4444 -122.3139 PRCP 1948 2024
ASN00086071 -37.8075  144.9700 TMAX 1855 2015
ASN00086071 -37.8075  144.9700 PRCP 1855 2015
";

/// Number of records in [`SAMPLE_INVENTORY`].
pub const SAMPLE_RECORD_COUNT: usize = 14;

/// Number of distinct stations in [`SAMPLE_INVENTORY`].
pub const SAMPLE_STATION_COUNT: usize = 5;

/// Stations of [`SAMPLE_INVENTORY`] inside [`corners::MIDWEST`].
pub const MIDWEST_STATIONS: [&str; 3] = ["USW00003947", "USW00013996", "USC00144972"];

/// Absolute year bounds of [`SAMPLE_INVENTORY`].
pub const SAMPLE_YEAR_BOUNDS: (i32, i32) = (1855, 2024);
