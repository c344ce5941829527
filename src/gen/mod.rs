//! Synthetic haversine dataset generation: the test-fixture side of the
//! crate. Produces the `{"pairs":[{"x0":..,"y0":..,"x1":..,"y1":..}, ...]}`
//! documents the parser consumes, together with the reference distances.

use std::fmt::Write;

/// Radius used by the reference haversine computation, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// xorshift64* generator. Seeding folds the seed into a fixed initial
/// state and runs one full draw, keeping the multiplied value as the new
/// state.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn seeded(seed: u64) -> Self {
        let mut rng = Self {
            state: 4101842887655102017 ^ seed,
        };
        rng.state = rng.next_u64();
        rng
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 21;
        self.state ^= self.state << 35;
        self.state ^= self.state >> 4;
        self.state.wrapping_mul(2685821657736338717)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        5.42101086242752217e-20 * self.next_u64() as f64
    }

    /// Uniform draw in `[min, max]`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

/// One coordinate pair: `(x0, y0)` to `(x1, y1)` in degrees lon/lat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Pair {
    pub fn distance(&self) -> f64 {
        haversine(self.x0, self.y0, self.x1, self.y1, EARTH_RADIUS_KM)
    }
}

/// Reference haversine distance between two lon/lat points.
pub fn haversine(x0: f64, y0: f64, x1: f64, y1: f64, radius: f64) -> f64 {
    let d_lat = (y1 - y0).to_radians();
    let d_lon = (x1 - x0).to_radians();
    let lat1 = y0.to_radians();
    let lat2 = y1.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    radius * c
}

/// Running statistics over the generated distances, mirroring the original
/// generator's summary output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Summary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn accumulate(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }
}

/// Generates `count` pairs. With `clusters > 0` the points are grouped into
/// random lat/lon boxes, which keeps the distances away from the uniform
/// sampler's degenerate global spread; with zero clusters every coordinate
/// is drawn over the whole globe.
pub fn generate_pairs(rng: &mut Rng, count: u64, clusters: u64) -> Vec<Pair> {
    let mut pairs = Vec::with_capacity(count as usize);
    if clusters == 0 {
        for _ in 0..count {
            pairs.push(Pair {
                x0: rng.range_f64(-180.0, 180.0),
                y0: rng.range_f64(-90.0, 90.0),
                x1: rng.range_f64(-180.0, 180.0),
                y1: rng.range_f64(-90.0, 90.0),
            });
        }
        return pairs;
    }

    let per_cluster = (count / clusters).max(1);
    while (pairs.len() as u64) < count {
        let lat0_size = rng.range_f64(10.0, 100.0);
        let lon0_size = rng.range_f64(20.0, 200.0);
        let lat0_start = rng.range_f64(-90.0, 90.0 - lat0_size);
        let lon0_start = rng.range_f64(-180.0, 180.0 - lon0_size);

        let lat1_size = rng.range_f64(10.0, 100.0);
        let lon1_size = rng.range_f64(20.0, 200.0);
        let lat1_start = rng.range_f64(-90.0, 90.0 - lat1_size);
        let lon1_start = rng.range_f64(-180.0, 180.0 - lon1_size);

        let remaining = count - pairs.len() as u64;
        for _ in 0..per_cluster.min(remaining) {
            pairs.push(Pair {
                x0: rng.range_f64(lon0_start, lon0_start + lon0_size),
                y0: rng.range_f64(lat0_start, lat0_start + lat0_size),
                x1: rng.range_f64(lon1_start, lon1_start + lon1_size),
                y1: rng.range_f64(lat1_start, lat1_start + lat1_size),
            });
        }
    }
    pairs
}

/// Serializes pairs into the document shape the parser accepts.
pub fn write_json(pairs: &[Pair]) -> String {
    // Rough per-pair budget: four coordinates at ~20 characters plus keys
    // and punctuation.
    let mut out = String::with_capacity(16 + pairs.len() * 120);
    out.push_str("{\"pairs\":[\n");
    for (index, pair) in pairs.iter().enumerate() {
        out.push_str("\t{");
        write_field(&mut out, "x0", pair.x0);
        out.push_str(", ");
        write_field(&mut out, "y0", pair.y0);
        out.push_str(", ");
        write_field(&mut out, "x1", pair.x1);
        out.push_str(", ");
        write_field(&mut out, "y1", pair.y1);
        out.push('}');
        if index + 1 < pairs.len() {
            out.push_str(",\n");
        }
    }
    out.push_str("\n]}");
    out
}

fn write_field(out: &mut String, name: &str, value: f64) {
    out.push('"');
    out.push_str(name);
    out.push_str("\":");
    crate::doc::write_float(out, value);
}

/// Reference distances plus their summary for a pair set.
pub fn expected_distances(pairs: &[Pair]) -> (Vec<f64>, Summary) {
    let mut distances = Vec::with_capacity(pairs.len());
    let mut summary = Summary::default();
    for pair in pairs {
        let distance = pair.distance();
        summary.accumulate(distance);
        distances.push(distance);
    }
    (distances, summary)
}

/// Whether a recomputed distance sum agrees with a reference sum. The
/// relative tolerance absorbs accumulation-order noise without letting a
/// wrong dataset pass.
pub fn sums_agree(actual: f64, reference: f64) -> bool {
    (actual - reference).abs() <= 1e-6 * reference.abs().max(1.0)
}

/// Formats the generator's report the way the original tool printed it.
pub fn report(seed: u64, pair_count: u64, summary: &Summary) -> String {
    let mut out = String::new();
    writeln!(out, "Seed: {seed}").expect("writing to String cannot fail");
    writeln!(out, "Pair Count: {pair_count}").expect("writing to String cannot fail");
    writeln!(out, "Expected Sum: {:.6}", summary.sum).expect("writing to String cannot fail");
    out
}
