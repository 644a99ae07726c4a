use pal_core::parse;

fn main() {
    let pal_data = "brand:
  primary: #336699
  secondary: #888
accent: =brand.primary
";

    match parse(pal_data, "example.pal") {
        Ok(doc) => {
            let json_output = doc.to_json().unwrap();
            println!("Successfully parsed PAL to JSON:\n{json_output}");

            let accent = doc.root().get("accent").unwrap();
            match accent.hexcolor() {
                Some(hex) => println!("accent resolves to {hex}"),
                None => println!("accent did not resolve"),
            }
        }
        Err(e) => {
            eprintln!("Failed to parse PAL: {e:?}");
        }
    }
}
