use clap::Parser;
use geojson::GeoJson;
use parcel_topology::geojson_io;
use parcel_topology::{TopologyConfig, TopologyMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (line work, points and labelled points)
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file (polygons with their islands as holes)
    #[arg(short, long)]
    output: PathBuf,

    /// Distance below which positions are the same point
    #[arg(long, default_value_t = 1e-3)]
    tolerance: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Reading input from {:?}", args.input);
    let file = File::open(&args.input)?;
    let reader = BufReader::new(file);
    let geojson: GeoJson = serde_json::from_reader(reader)?;

    let config = TopologyConfig::new().with_length_tolerance(args.tolerance);
    let mut map = TopologyMap::new(config)?;
    let summary = geojson_io::import(&mut map, &geojson)?;
    println!(
        "Loaded {} line(s), {} point(s), {} label(s); skipped {}.",
        summary.lines, summary.points, summary.labels, summary.skipped
    );

    let report = map.settle()?;
    println!(
        "Cut {} line(s) into {} divider(s); {} polygon(s), {} island(s), {} floating.",
        report.intersect.lines_recut,
        map.dividers().count(),
        map.polygons().count(),
        map.islands().count(),
        report.build.floating_islands
    );

    let output = geojson_io::export_polygons(&map);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &GeoJson::FeatureCollection(output))?;

    println!("Wrote output to {:?}", args.output);
    Ok(())
}
