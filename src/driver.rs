use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;
use crate::events::EventChain;
use crate::hist::{Axis, Format, Histogram, HistogramSet, Observable, output_tree, write_output};
use crate::runtime;
use crate::selection::{Outcome, PipelineState, RunCounts, Selection};
use crate::weights::{Reweight, Reweighter, WeightCatalog};

pub struct RunArgs {
    pub config: PathBuf,
    pub output: PathBuf,
    pub inputs: Vec<PathBuf>,
}

/// Build every reweighter and the sealed catalog `[baseline, variants...]`.
pub fn build_catalog(conf: &Config, chain: &EventChain) -> Result<(WeightCatalog, Vec<Reweighter>)> {
    let mut catalog = WeightCatalog::new(&conf.weight);
    let mut reweighters = Vec::with_capacity(conf.reweighting.len());
    for (i, def) in conf.reweighting.iter().enumerate() {
        let rew = Reweighter::new(chain, def).with_context(|| format!("reweighting[{i}]"))?;
        for name in rew.weights_names() {
            if !catalog.register(name) {
                bail!("reweighting[{i}]: duplicate weight name \"{name}\"");
            }
        }
        reweighters.push(rew);
    }
    catalog.seal();
    Ok((catalog, reweighters))
}

fn build_histograms(conf: &Config, catalog: &WeightCatalog) -> Result<HistogramSet> {
    let mut hists = HistogramSet::new(catalog);
    hists.add(
        "total",
        Histogram::new(Axis::Single, Observable::Total, catalog, conf.sumw2),
    );
    if let Some(edges) = &conf.njets_edges {
        let axis = Axis::edges(edges.clone()).context("njets_edges")?;
        hists.add(
            "njets",
            Histogram::new(axis, Observable::NJets, catalog, conf.sumw2),
        );
    }
    Ok(hists)
}

/// The event loop: every row of `chain`, in order, through the selection.
pub fn process(conf: &Config, chain: &EventChain) -> Result<(HistogramSet, RunCounts)> {
    let (catalog, reweighters) = build_catalog(conf, chain)?;
    log::info!(
        "[weights] {} weights: {}",
        catalog.width(),
        itertools::join(catalog.names(), ", ")
    );

    let mut hists = build_histograms(conf, &catalog)?;
    let mut selection = Selection::new(chain, conf, reweighters)?;
    log::info!("[jets] {}", selection.jet_definition().description());
    let mut state = PipelineState::new(catalog.width());

    let n_entries = chain.n_entries();
    let pb = ProgressBar::new(n_entries);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} rows ({per_sec}, eta {eta})")?
            .progress_chars("=>-"),
    );

    let t0 = Instant::now();
    for row in chain.rows() {
        if let Outcome::Fill(obs) = selection.process(&row, &mut state)? {
            hists.fill(&obs, &state.weights);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    hists.finalize();
    let counts = state.counts;
    if let Some(total) = hists.get("total") {
        let bin = &total.bins()[0];
        log::info!(
            "[total] nent={} {}: sum={:.6e} +- {:.6e}",
            bin.n_entries(),
            catalog.names()[0],
            bin.sum_w()[0],
            bin.sum_w2()[0].sqrt()
        );
    }
    log::info!(
        "[loop] entries={} events={} count={} ({:.3}s)",
        counts.entries,
        counts.events,
        counts.count,
        t0.elapsed().as_secs_f64()
    );
    Ok((hists, counts))
}

pub fn run(args: &RunArgs) -> Result<RunCounts> {
    let (conf, raw) = Config::load(&args.config)?;
    log::info!("[config] {}", raw);

    let chain = EventChain::open(&args.inputs)?;
    log::info!("[chain] table name: {}", chain.name());
    for t in chain.tables() {
        log::info!(
            "[chain] {} ({} rows, {} particles)",
            t.path.display(),
            t.n_rows(),
            t.n_particles_total()
        );
    }
    runtime::report_memory("inputs loaded");

    let (hists, counts) = process(&conf, &chain)?;

    let format = Format::from_path(&args.output, conf.pretty_json);
    write_output(&args.output, &output_tree(&hists, &counts), format)?;
    log::info!("[output] {} ({:?})", args.output.display(), format);
    runtime::report_memory("done");
    Ok(counts)
}
