//! # Quire CLI
//!
//! Usage:
//!   quire book.xml -o book.pdf
//!   quire book.xml -c config.json -o book.pdf
//!   cat book.xml | quire -o book.pdf
//!   quire --example > book.xml
//!
//! Set `RUST_LOG=debug` to follow pagination.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_book_xml());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), quire::QuireError> {
    let input = match args.get(1).filter(|a| !a.starts_with('-')) {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let config = flag(args, "-c").map(fs::read_to_string).transpose()?;
    let output = flag(args, "-o").unwrap_or("output.pdf");

    let mut doc = quire::compose_xml(&input, config.as_deref())?;
    for warning in doc.composer.diagnostics.warnings() {
        eprintln!("! {}", warning);
    }
    doc.export(Path::new(output), true)?;
    eprintln!("✓ Written {} pages to {}", doc.page_count(), output);
    Ok(())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == name).map(|w| w[1].as_str())
}

fn example_book_xml() -> &'static str {
    r#"<document>
  <template name="cover"/>
  <h1>A Small Book</h1>
  <template name="tableOfContent"/>
  <chapter/>
  <h2>Beginnings</h2>
  <p>Every page of this book is made by flowing text through the main box of
  one page after another, until nothing is left over.</p>
  <p>Markers such as <em>chapter</em> pick the template that receives the
  content that follows them.</p>
  <chapter/>
  <h2>Endings</h2>
  <p>Page numbers are filled in once all pages exist.</p>
  <template name="colophon"/>
  <p>Set in Courier.</p>
</document>
"#
}
