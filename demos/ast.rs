fn main() {
    let args: Vec<_> = std::env::args().collect();

    if args.len() != 2 {
        println!("Usage:\n\tcargo run --example ast -- input.xml");
        std::process::exit(1);
    }

    let text = std::fs::read_to_string(&args[1]).unwrap();

    // Keep the DTD for this example.
    let opt = xmlbranch::ParsingOptions {
        include_internal_dtd_declarations: true,
        ..xmlbranch::ParsingOptions::default()
    };

    match xmlbranch::parse_with(&text, Some(args[1].as_str()), &opt, None) {
        Ok(doc) => {
            if let Some(doc_type) = doc.doc_type() {
                println!("{:?}", doc_type);
            }
            print!("{:?}", doc);
        }
        Err(e) => println!("Error: {}.", e),
    }
}
