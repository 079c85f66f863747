//! Print how each pass sees one or more clusters.
//!
//! Usage: explain-cluster <input> <cluster_id>... [--table NAME] [--delimiter C]

use anyhow::{bail, Result};
use clap::Parser;
use cluster_verify::config::TableArgs;
use cluster_verify::io::read_table;
use cluster_verify::models::{Cluster, MatchPass};
use cluster_verify::orchestrator::verify_clusters;
use cluster_verify::passes::full::{is_full_match, SentinelPolicy};
use cluster_verify::passes::{cross_link, exact, linked};
use cluster_verify::progress::set_log_only;
use cluster_verify::standardize::StandardizedField;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "explain-cluster")]
#[command(about = "Show standardized fields and per-pass results for selected clusters")]
struct Args {
    input: PathBuf,

    #[arg(required = true)]
    cluster_ids: Vec<String>,

    #[command(flatten)]
    table: TableArgs,
}

fn show_set(set: &StandardizedField) -> String {
    format!("{{{}}}", set.sorted_tokens().join(", "))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn explain(cluster: &Cluster) {
    println!("Rows:");
    for member in &cluster.members {
        println!(
            "  row {:>5}  {:<30} phones={} emails={}",
            member.record.display_row(),
            member.record.full_name,
            show_set(&member.phones),
            show_set(&member.emails)
        );
    }

    println!("Pass 1 ({})", MatchPass::First.description());
    println!("  phones: {}", yes_no(is_full_match(cluster.phone_sets(), SentinelPolicy::Exclude)));
    println!("  emails: {}", yes_no(is_full_match(cluster.email_sets(), SentinelPolicy::Exclude)));

    println!("Pass 2 ({})", MatchPass::Second.description());
    println!("  phones: {}", yes_no(linked::is_linked_match(cluster.phone_sets())));
    println!("  emails: {}", yes_no(linked::is_linked_match(cluster.email_sets())));

    println!("Pass 3 ({})", MatchPass::Third.description());
    let analysis = cross_link::analyze(cluster);
    for link in &analysis.links {
        println!(
            "  link row {} <-> row {} on {}",
            cluster.members[link.left].record.display_row(),
            cluster.members[link.right].record.display_row(),
            link.fields()
        );
    }
    for (i, component) in analysis.components.iter().enumerate() {
        let rows: Vec<String> = component
            .iter()
            .map(|&p| cluster.members[p].record.display_row().to_string())
            .collect();
        println!("  component {}: rows {}", i + 1, rows.join(", "));
    }
    println!(
        "  single component: {}",
        yes_no(analysis.is_single_component(cluster.len()))
    );

    println!("Pass 4 ({})", MatchPass::Fourth.description());
    let agreement = exact::attribute_agreement(cluster);
    println!(
        "  name={} country={} state={} city={}",
        yes_no(agreement.name),
        yes_no(agreement.country),
        yes_no(agreement.state),
        yes_no(agreement.city)
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    set_log_only(true);

    let table = read_table(&args.input, &args.table.table, &args.table.columns())?;
    let outcome = verify_clusters(table.records, args.table.delimiter);

    let mut missing = Vec::new();
    for id in &args.cluster_ids {
        let Some(cluster) = outcome.clusters.iter().find(|c| &c.id == id) else {
            missing.push(id.clone());
            continue;
        };

        println!("\n{:=<80}", "");
        println!("Cluster {} ({} rows)", cluster.id, cluster.len());
        println!("{:-<80}", "");
        explain(cluster);

        println!("{:-<80}", "");
        match outcome.verdict_for(id) {
            Some(verdict) => {
                println!("Verdict: {}", verdict.pass.column_text());
                for (position, member) in cluster.members.iter().enumerate() {
                    println!(
                        "  row {:>5}: {}",
                        member.record.display_row(),
                        verdict.criteria_for(position)
                    );
                }
            }
            None => println!("Verdict: unmatched"),
        }
    }

    if !missing.is_empty() {
        bail!("Unknown cluster id(s): {}", missing.join(", "));
    }
    Ok(())
}
