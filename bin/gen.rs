use clap::{Arg, ArgAction, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic company file to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("websites")
                .long("websites")
                .help("Emit merge rows [name, zipcode, website] instead of bootstrap rows")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("delim")
                .long("delim")
                .value_parser([",", ";"])
                .default_value(","),
        )
        .arg(
            Arg::new("bad-every")
                .long("bad-every")
                .help("Make every Nth zipcode malformed (0 = never)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .get_matches();

    let rows = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let websites = matches.get_flag("websites");
    let delim = matches.get_one::<String>("delim").map(String::as_str).unwrap_or(",");
    let bad_every = matches.get_one::<u64>("bad-every").copied().unwrap_or_default();

    let mut out = io::BufWriter::new(io::stdout().lock());

    if delim == ";" {
        writeln!(&mut out, "# generated company file")?;
    }

    for i in 0..rows {
        let zipcode = if bad_every > 0 && i % bad_every == 0 {
            format!("{}", i % 1000)
        } else {
            format!("{:05}", i % 100_000)
        };
        write!(&mut out, "COMPANY {i:08}{delim}{zipcode}")?;
        if websites {
            write!(&mut out, "{delim}http://company-{i}.example")?;
        }
        writeln!(&mut out)?;
        // keep buffers moving on huge runs
        if i % 10_000 == 0 {
            out.flush()?;
        }
    }

    out.flush()?;
    Ok(())
}
