use std::env;
use std::path::Path;

fn usage() {
    eprintln!(
        "Usage: xtci <command> [args]\n\
         \n\
         Commands:\n\
         \x20 info <file>                      print header, metadata and page table\n\
         \x20 toc <file>                       print the chapter list\n\
         \x20 unpack <file> <dir>              extract every page blob\n\
         \x20 pack <out.xtc> <image...>        build a 1-bpp container from images\n\
         \x20      [--title T] [--author A] [--chapter NAME@START[-END]]..."
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }
    let command = args.remove(0);

    let result = match command.as_str() {
        "info" if args.len() == 1 => xtci::info(Path::new(&args[0])),
        "toc" if args.len() == 1 => xtci::toc(Path::new(&args[0])),
        "unpack" if args.len() == 2 => xtci::unpack(Path::new(&args[0]), Path::new(&args[1])),
        "pack" if args.len() >= 2 => run_pack(args),
        _ => {
            usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("xtci: {err}");
        std::process::exit(1);
    }
}

fn run_pack(mut args: Vec<String>) -> Result<(), xtci::CliError> {
    let output = args.remove(0);
    let mut options = xtci::PackOptions::default();
    let mut inputs = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--title" => {
                i += 1;
                options.title = args.get(i).cloned();
            }
            "--author" => {
                i += 1;
                options.author = args.get(i).cloned();
            }
            "--chapter" => {
                i += 1;
                let raw = args
                    .get(i)
                    .ok_or_else(|| xtci::CliError::Invalid("--chapter needs a value".into()))?;
                options.chapters.push(xtci::parse_chapter_spec(raw)?);
            }
            other => inputs.push(other.to_string()),
        }
        i += 1;
    }

    if inputs.is_empty() {
        return Err(xtci::CliError::Invalid("no input images".into()));
    }
    xtci::pack(Path::new(&output), &inputs, &options)
}
