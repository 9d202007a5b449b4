//! Simple demonstration of the psak din search engine.
//!
//! Loads a few sample rulings into a throwaway store, builds the index and
//! runs free-text and condition searches.

use psak_search::config::Config;
use psak_search::search::SearchEngine;
use psak_search::{Document, FilterRules, SearchCondition};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Psak Din Search Engine - Demo");
    println!("=============================");

    let mut config = Config::default();
    config.storage.db_path = "./demo_data/psak_search.db".into();

    let engine = SearchEngine::open(config).await?;

    let rulings = vec![
        Document {
            id: "bk-1".to_string(),
            title: "שור שנגח את הפרה".to_string(),
            court: "בית דין ירושלים".to_string(),
            year: 2015,
            full_text: "בפנינו תביעה בעניין שור שנגח את הפרה\nנפסק כי בעל השור חייב בחצי נזק".to_string(),
            summary: String::new(),
        },
        Document {
            id: "bk-2".to_string(),
            title: "חמור שנגח חמור".to_string(),
            court: "בית דין חיפה".to_string(),
            year: 2018,
            full_text: "חמור שנגח חמור של חברו\nנדחתה התביעה מחמת הספק".to_string(),
            summary: String::new(),
        },
    ];

    engine.storage().replace_corpus(rulings).await?;

    let outcome = engine.search(Some("שור"), None).await?;
    println!("\nFree-text 'שור': {} results", outcome.results.len());
    for result in &outcome.results {
        println!("  [{}] {} ({}, {})", result.score, result.title, result.court, result.year);
        for m in &result.matches {
            println!("    line {}: {}", m.line_number, m.highlighted_line);
        }
    }

    let rules = FilterRules::all_of(vec![SearchCondition::YearBetween {
        from: 2016,
        to: 2020,
    }]);
    let outcome = engine.search(None, Some(&rules)).await?;
    println!("\nRulings from 2016-2020: {} results", outcome.results.len());
    for result in &outcome.results {
        println!("  {} ({})", result.title, result.year);
    }

    Ok(())
}
