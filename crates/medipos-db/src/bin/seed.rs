//! # Seed Data Generator
//!
//! Populates the database with a demo pharmacy catalog for development.
//!
//! ## Usage
//! ```bash
//! # Default: 60 medicines, 3 batches each
//! cargo run -p medipos-db --bin seed
//!
//! # Custom amount
//! cargo run -p medipos-db --bin seed -- --count 100
//!
//! # Specify database path
//! cargo run -p medipos-db --bin seed -- --db ./data/medipos.db
//! ```
//!
//! ## Generated Data
//! Each medicine gets a unique code (`{CATEGORY}-{INDEX}`) and a ladder of
//! batches with staggered expiry dates - one expiring soon, one mid-range,
//! one far out - so FEFO behavior is visible immediately in a dev build.

use chrono::{Duration, Utc};
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use medipos_core::{Batch, Medicine};
use medipos_db::{Database, DbConfig};

/// Medicine names per category for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "ANL",
        &[
            "Paracetamol 500mg",
            "Paracetamol 650mg",
            "Ibuprofen 200mg",
            "Ibuprofen 400mg",
            "Aspirin 300mg",
            "Diclofenac 50mg",
            "Naproxen 250mg",
            "Tramadol 50mg",
            "Mefenamic Acid 500mg",
            "Ketorolac 10mg",
        ],
    ),
    (
        "ANT",
        &[
            "Amoxicillin 250mg",
            "Amoxicillin 500mg",
            "Azithromycin 250mg",
            "Azithromycin 500mg",
            "Ciprofloxacin 500mg",
            "Cephalexin 500mg",
            "Doxycycline 100mg",
            "Metronidazole 400mg",
            "Clarithromycin 250mg",
            "Levofloxacin 500mg",
        ],
    ),
    (
        "ALG",
        &[
            "Cetirizine 10mg",
            "Loratadine 10mg",
            "Fexofenadine 120mg",
            "Fexofenadine 180mg",
            "Chlorpheniramine 4mg",
            "Montelukast 10mg",
            "Desloratadine 5mg",
            "Levocetirizine 5mg",
            "Hydroxyzine 25mg",
            "Ketotifen 1mg",
        ],
    ),
    (
        "GAS",
        &[
            "Omeprazole 20mg",
            "Omeprazole 40mg",
            "Esomeprazole 40mg",
            "Pantoprazole 40mg",
            "Ranitidine 150mg",
            "Domperidone 10mg",
            "Ondansetron 4mg",
            "Loperamide 2mg",
            "Lactulose Syrup",
            "Antacid Suspension",
        ],
    ),
    (
        "CRD",
        &[
            "Amlodipine 5mg",
            "Amlodipine 10mg",
            "Losartan 50mg",
            "Atenolol 50mg",
            "Metoprolol 50mg",
            "Atorvastatin 20mg",
            "Rosuvastatin 10mg",
            "Clopidogrel 75mg",
            "Enalapril 10mg",
            "Bisoprolol 5mg",
        ],
    ),
    (
        "DIA",
        &[
            "Metformin 500mg",
            "Metformin 850mg",
            "Glimepiride 2mg",
            "Gliclazide 80mg",
            "Sitagliptin 100mg",
            "Empagliflozin 10mg",
            "Insulin Glargine",
            "Insulin Aspart",
            "Pioglitazone 15mg",
            "Vildagliptin 50mg",
        ],
    ),
];

/// Expiry ladder, in days from today. One soon-expiring, one mid-range,
/// one far-out batch per medicine.
const EXPIRY_LADDER_DAYS: &[i64] = &[45, 180, 540];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./medipos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MediPOS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of medicines to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./medipos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 MediPOS Seed Data Generator");
    println!("==============================");
    println!("Database:  {}", db_path);
    println!("Medicines: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing medicines
    let existing = db.medicines().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate medicines and their batch ladders
    println!();
    println!("Generating medicines...");

    let mut generated = 0;
    let mut batches_generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_code, names) in CATEGORIES {
        for (idx, name) in names.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let medicine = generate_medicine(category_code, name, idx);
            if let Err(e) = db.medicines().insert(&medicine).await {
                eprintln!("Failed to insert {}: {}", medicine.code, e);
                continue;
            }
            generated += 1;

            for (ladder_idx, days) in EXPIRY_LADDER_DAYS.iter().enumerate() {
                let batch = generate_batch(&medicine, ladder_idx, *days, generated);
                if let Err(e) = db.batches().insert(&batch).await {
                    eprintln!("Failed to insert batch {}: {}", batch.batch_number, e);
                    continue;
                }
                batches_generated += 1;
            }

            if generated % 20 == 0 {
                println!("  Generated {} medicines...", generated);
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} medicines with {} batches in {:?}",
        generated, batches_generated, elapsed
    );

    // Verify the projections
    println!();
    println!("Verifying projections...");
    let low = db.medicines().below_reorder().await?;
    println!("  Low-stock medicines: {}", low.len());

    let today = Utc::now().date_naive();
    let expiring = db.batches().expiring_within(today, 60).await?;
    println!("  Batches expiring within 60 days: {}", expiring.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single medicine with a deterministic code.
fn generate_medicine(category: &str, name: &str, idx: usize) -> Medicine {
    let now = Utc::now();

    Medicine {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        code: format!("{}-{:03}", category, idx + 1),
        category: Some(category.to_string()),
        // Roughly a third of medicines get a threshold high enough to show
        // up in the low-stock projection right after seeding
        reorder_threshold: if idx % 3 == 0 { 100 } else { 10 },
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Generates one batch of a medicine's expiry ladder.
fn generate_batch(medicine: &Medicine, ladder_idx: usize, expiry_days: i64, seed: usize) -> Batch {
    let now = Utc::now();

    // Price: base $0.50 - $8.50 per unit, later cohorts slightly pricier
    let selling_price_cents = 50 + ((seed * 37) % 800) as i64 + (ladder_idx as i64) * 15;
    let purchase_price_cents = selling_price_cents * 70 / 100;

    Batch {
        id: Uuid::new_v4().to_string(),
        medicine_id: medicine.id.clone(),
        batch_number: format!("LOT-{}-{:02}", medicine.code, ladder_idx + 1),
        expiry_date: now.date_naive() + Duration::days(expiry_days),
        remaining_quantity: 10 + ((seed * 13) % 90) as i64,
        purchase_price_cents,
        selling_price_cents,
        supplier_id: Some(format!("supplier-{}", (seed % 4) + 1)),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
