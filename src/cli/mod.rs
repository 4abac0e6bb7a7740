use std::path::Path;

use anyhow::Result;

use crate::services::{dataset, trainer};
use crate::store;

/// Build the feature table from a raw match CSV.
pub fn prepare_features(input: &Path, output: &Path) -> Result<()> {
    println!("🔄 Preparing features from {}...", input.display());

    let matches = store::read_matches_csv(input)?;
    println!("📥 Loaded {} raw matches", matches.len());

    let report = dataset::assemble(&matches);
    println!(
        "📉 Dropped {} rows without usable odds, {} without rolling history",
        report.dropped_odds, report.dropped_features
    );

    store::write_feature_table(output, &report.rows)?;
    println!(
        "✅ Wrote {} feature rows to {}",
        report.rows.len(),
        output.display()
    );
    Ok(())
}

/// Train the pricing model and persist the artifact triple.
pub fn train_model(input: &Path, model_dir: &Path, test_size: usize) -> Result<()> {
    println!("🔮 Training pricing model from {}...", input.display());

    let rows = store::read_feature_table(input)?;
    println!("📥 Loaded {} feature rows", rows.len());

    let report = trainer::train(&rows, test_size)?;
    store::save_artifacts(model_dir, &report.scaler, &report.model, &report.info)?;

    print_train_report(&report);
    println!("\n💾 Artifacts saved to {}", model_dir.display());
    Ok(())
}

/// Write a synthetic raw match CSV for local pipeline runs.
pub fn generate_sample(output: &Path, n_matches: usize, n_teams: usize, seed: u64) -> Result<()> {
    println!(
        "🎲 Generating {} synthetic matches across {} teams (seed {})...",
        n_matches, n_teams, seed
    );

    let matches = store::sample::generate_matches(n_matches, n_teams, seed);
    store::write_matches_csv(output, &matches)?;

    println!("✅ Wrote {} matches to {}", matches.len(), output.display());
    println!("💡 Next: fairline prepare --input {}", output.display());
    Ok(())
}

fn print_train_report(report: &trainer::TrainReport) {
    let info = &report.info;

    println!(
        "\n🏆 TRAINING RESULTS ({} train / {} test)",
        info.train_size, info.test_size
    );
    println!("   MAE:        {:.4}", info.mae);
    println!("   Log loss:   {:.4}", info.log_loss);
    println!("   Odds error: {:.4}", info.odds_error);

    println!("\n⚖️  FEATURE IMPORTANCE");
    let mut weighted: Vec<(&str, f64)> = info
        .features
        .iter()
        .map(|s| s.as_str())
        .zip(report.model.coef.iter().copied())
        .collect();
    weighted.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    for (name, coef) in &weighted {
        println!("   {:<16} {:+.4}", name, coef);
    }
    println!("   {:<16} {:+.4}", "intercept", report.model.intercept);

    println!("\n🔍 LAST {} HELD-OUT MATCHES", report.holdout.len().min(25));
    println!(
        "   {:<10} {:<34} {:>8} {:>8} {:>7} {:>7}",
        "Date", "Match", "Market", "Model", "Diff", "Prob"
    );
    let start = report.holdout.len().saturating_sub(25);
    for h in &report.holdout[start..] {
        let fixture = format!("{} vs {}", h.home_team, h.away_team);
        println!(
            "   {:<10} {:<34} {:>8.2} {:>8.2} {:>+7.2} {:>6.1}%",
            h.date.format("%Y-%m-%d"),
            fixture,
            h.market_odd,
            h.model_odd,
            h.model_odd - h.market_odd,
            h.model_prob * 100.0
        );
    }
}
