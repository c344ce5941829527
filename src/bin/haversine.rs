//! Haversine dataset tool: `gen` writes a synthetic pairs document plus a
//! binary sidecar of reference distances, `sum` parses a document and
//! recomputes the distance sum, checking it against the sidecar when one is
//! present.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use monojson::gen::{self, Pair, Rng, Summary};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("gen") => run_gen(&args[1..]),
        Some("sum") => run_sum(&args[1..]),
        _ => {
            eprintln!("usage: haversine gen <seed> <pairs> <clusters> <name>");
            eprintln!("       haversine sum <file.json>");
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_gen(args: &[String]) -> Result<(), String> {
    let [seed, pairs, clusters, name] = args else {
        return Err("gen expects <seed> <pairs> <clusters> <name>".into());
    };
    let seed: u64 = seed.parse().map_err(|_| format!("bad seed {seed:?}"))?;
    let count: u64 = pairs.parse().map_err(|_| format!("bad pair count {pairs:?}"))?;
    let clusters: u64 = clusters
        .parse()
        .map_err(|_| format!("bad cluster count {clusters:?}"))?;

    let mut rng = Rng::seeded(seed);
    let pairs = gen::generate_pairs(&mut rng, count, clusters);
    let (distances, summary) = gen::expected_distances(&pairs);

    let json_path = PathBuf::from(format!("{name}.json"));
    fs::write(&json_path, gen::write_json(&pairs))
        .map_err(|err| format!("writing {}: {err}", json_path.display()))?;

    // Sidecar: every reference distance in native byte order, then the sum.
    let sidecar_path = PathBuf::from(format!("{name}.f64"));
    let mut sidecar = Vec::with_capacity((distances.len() + 1) * 8);
    for distance in &distances {
        sidecar.extend_from_slice(&distance.to_ne_bytes());
    }
    sidecar.extend_from_slice(&summary.sum.to_ne_bytes());
    fs::write(&sidecar_path, sidecar)
        .map_err(|err| format!("writing {}: {err}", sidecar_path.display()))?;

    print!("{}", gen::report(seed, count, &summary));
    Ok(())
}

fn run_sum(args: &[String]) -> Result<(), String> {
    let [path] = args else {
        return Err("sum expects <file.json>".into());
    };
    let path = Path::new(path);
    let document = monojson::parse_file(path).map_err(|err| err.to_string())?;

    let pairs = document
        .get("pairs")
        .and_then(|value| value.as_array())
        .map_err(|err| err.to_string())?;

    let mut summary = Summary::default();
    for entry in pairs.iter() {
        let pair = read_pair(&entry).map_err(|err| err.to_string())?;
        summary.accumulate(pair.distance());
    }

    println!("Input size: {}", document.byte_size());
    println!("Pair count: {}", summary.count);
    println!("Haversine sum: {:.6}", summary.sum);
    println!("Haversine mean: {:.6}", summary.mean());

    let sidecar_path = path.with_extension("f64");
    if sidecar_path.exists() {
        let bytes = fs::read(&sidecar_path)
            .map_err(|err| format!("reading {}: {err}", sidecar_path.display()))?;
        if bytes.len() >= 8 {
            let tail: [u8; 8] = bytes[bytes.len() - 8..].try_into().expect("8-byte slice");
            let expected = f64::from_ne_bytes(tail);
            println!("Reference sum: {expected:.6}");
            println!("Difference: {:.6}", summary.sum - expected);
            if !gen::sums_agree(summary.sum, expected) {
                return Err(format!(
                    "recomputed sum {:.6} disagrees with reference {expected:.6}",
                    summary.sum
                ));
            }
        }
    }
    Ok(())
}

fn read_pair(value: &monojson::ValueRef<'_>) -> monojson::Result<Pair> {
    Ok(Pair {
        x0: value.get("x0")?.as_float()?,
        y0: value.get("y0")?.as_float()?,
        x1: value.get("x1")?.as_float()?,
        y1: value.get("y1")?.as_float()?,
    })
}
