//! The `qwest init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create qwest.toml
    if std::path::Path::new("qwest.toml").exists() {
        println!("qwest.toml already exists, skipping.");
    } else {
        std::fs::write("qwest.toml", SAMPLE_CONFIG)?;
        println!("Created qwest.toml");
    }

    // Create example question bank
    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/animals.toml");
    if example_path.exists() {
        println!("banks/animals.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/animals.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: qwest validate --bank banks/animals.toml");
    println!("  2. Run: qwest play --profile kid --bank animals@1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# qwest configuration

banks_dir = "./banks"
data_dir = "./qwest-data"

# Extra blocklist terms on top of the builtin list.
# [[blocklist]]
# term = "darn"
# mode = "whole_word"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "animals"
name = "Animal Friends"
description = "Name and match common animals"
version = "1"

[[questions]]
id = "q-cat"
prompt = "Which animal says meow?"
answers = ["cat", "kitty"]
category = "pets"
difficulty = "easy"
points = 10

[[questions]]
id = "q-dog"
prompt = "Which animal says woof?"
answers = ["dog", "puppy"]
category = "pets"
difficulty = "easy"
points = 10

[[questions]]
id = "q-farm"
difficulty = "medium"
points = 20

[questions.image]
asset = "farm-animals.png"
alt = "Four farm animals in a field"

[[questions.pairs]]
left = "cow"
right = "cow.png"

[[questions.pairs]]
left = "pig"
right = "pig.png"

[[questions.pairs]]
left = "sheep"
right = "sheep.png"

[[questions.pairs]]
left = "horse"
right = "horse.png"
"#;
