//! Basic usage of the node set API

use htmlquery::{FilterArg, FilterMode, ParseOptions, Parser};

fn main() -> htmlquery::Result<()> {
    println!("=== htmlquery - Basic Examples ===\n");

    let parser = Parser::new();

    // Example 1: Query and read
    let page = parser.parse(
        "<div class=\"post\"><h2>Title</h2><p>First.</p><p>Second.</p></div>",
        None,
    )?;
    println!("Paragraph text: {}", page.find("p")?.get_text()?);

    // Example 2: Append and replace
    page.append(["<p>Appended.</p>"])?;
    page.find("h2")?.set_text("New title")?;
    println!("After append: {page}");

    // Example 3: Filter copies
    let long = page.find("p")?.filter(FilterMode::Value, |arg| match arg {
        FilterArg::Value(node) => node.text().map(|t| t.len() > 6).unwrap_or(false),
        _ => false,
    })?;
    println!("Long paragraphs (copies): {long}");

    // Example 4: Remove
    page.remove(Some("p"))?;
    println!("After remove: {page}");

    // Example 5: Byte input with an explicit charset
    let options = ParseOptions::new().enforce_encoding("ISO-8859-1");
    let latin = parser.parse_bytes(b"<p>Caf\xE9</p>", None, Some(&options))?;
    println!("Decoded ({}): {}", latin.charset(), latin.get_text()?);

    Ok(())
}
