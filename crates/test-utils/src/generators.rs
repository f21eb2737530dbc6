//! Generators for synthetic yearly observation partitions.
//!
//! A partition is the headerless CSV published per year, one line per
//! station, day and element:
//!
//! ```text
//! USW00003947,20010101,TMAX,33,,,W,2400
//! ```

/// Build the partition text for one year.
///
/// Each station gets `days` daily values for each element, starting on
/// January 1st. The data value is `day * 10 + element index`, which makes
/// every line distinct and easy to check.
///
/// # Example
///
/// ```
/// use test_utils::observation_partition;
///
/// let csv = observation_partition(2001, &["USW00003947"], &["TMAX", "PRCP"], 2);
/// assert_eq!(csv.lines().count(), 4);
/// assert!(csv.starts_with("USW00003947,20010101,TMAX,10,,,W,2400\n"));
/// ```
pub fn observation_partition(year: i32, stations: &[&str], elements: &[&str], days: u32) -> String {
    let mut out = String::new();
    for station in stations {
        for day in 1..=days {
            for (idx, element) in elements.iter().enumerate() {
                out.push_str(&format!(
                    "{},{}01{:02},{},{},,,W,2400\n",
                    station,
                    year,
                    day,
                    element,
                    day * 10 + idx as u32
                ));
            }
        }
    }
    out
}

/// Number of lines [`observation_partition`] produces.
pub fn observation_line_count(stations: usize, elements: usize, days: u32) -> usize {
    stations * elements * days as usize
}

/// Build an inventory line in the fixed published layout.
pub fn inventory_line(station: &str, lat: f64, lon: f64, element: &str, begin: i32, end: i32) -> String {
    format!(
        "{:<11} {:>8.4} {:>9.4} {} {} {}",
        station, lat, lon, element, begin, end
    )
}

/// Build an inventory with `stations` stations spread on a grid over
/// `[lon0, lon0 + span] x [lat0, lat0 + span]`, each carrying `elements`.
pub fn grid_inventory(stations: usize, lon0: f64, lat0: f64, span: f64, elements: &[&str]) -> String {
    let side = (stations as f64).sqrt().ceil().max(1.0) as usize;
    let step = if side > 1 { span / (side - 1) as f64 } else { 0.0 };

    let mut out = String::new();
    for n in 0..stations {
        let lon = lon0 + (n % side) as f64 * step;
        let lat = lat0 + (n / side) as f64 * step;
        let id = format!("TST{:08}", n);
        for element in elements {
            out.push_str(&inventory_line(&id, lat, lon, element, 1900 + (n % 50) as i32, 2000 + (n % 25) as i32));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_lines() {
        let csv = observation_partition(2002, &["A", "B"], &["TMAX"], 3);
        assert_eq!(csv.lines().count(), observation_line_count(2, 1, 3));
        assert!(csv.contains("B,20020103,TMAX,30,,,W,2400"));
    }

    #[test]
    fn test_inventory_line_layout() {
        let line = inventory_line("USW00003947", 39.2972, -94.7306, "TMAX", 1972, 2024);
        assert_eq!(line, "USW00003947  39.2972  -94.7306 TMAX 1972 2024");
    }

    #[test]
    fn test_grid_inventory() {
        let text = grid_inventory(9, -100.0, 30.0, 10.0, &["PRCP", "TMAX"]);
        assert_eq!(text.lines().count(), 18);
        assert!(text.contains("TST00000008  40.0000  -90.0000 PRCP"));
    }
}
