use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tour-media",
    about = "Compress station photos to fit the history tour upload budget",
    long_about = "tour-media recompresses station photos so that every upload fits a byte budget \
                  (500 KiB by default). Opaque images become JPEG with stepped-down quality, \
                  images with transparency become palette PNG with stepped-down colour counts. \
                  Resolution is never changed.",
    version,
    after_help = "EXAMPLES:\n  \
    tour-media compress burg.png ./out\n  \
    tour-media batch \"./fotos/*.jpg\" ./out -r -j 4\n  \
    tour-media store wappen.png --root ./wwwroot --station 7\n  \
    tour-media info kirche.gif"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "Print every compression attempt")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress one image into the output directory. The output keeps the input \
                      file stem and gets the extension of the format actually written (.jpg or .png)."
    )]
    Compress {
        #[arg(help = "Input image file path (.jpg, .jpeg, .png, .gif)")]
        input: PathBuf,

        #[arg(help = "Output directory")]
        output: PathBuf,

        #[arg(
            short = 'm',
            long,
            help = "Byte budget for the result (default: 512000)",
            long_help = "Largest size the compressed file should have. If no quality or palette \
                         level gets below it, the smallest encoding is kept anyway."
        )]
        max_bytes: Option<u64>,
    },

    #[command(
        about = "Compress multiple images in parallel",
        long_about = "Process every upload-format image found in a directory, glob or single file. \
                      Failed files are reported and skipped."
    )]
    Batch {
        #[arg(
            help = "Input directory, file, or glob",
            long_help = "Input can be a directory path, a single file, or a glob expression. \
                         Examples: './fotos', '*.png', '/data/stations/*.jpg'"
        )]
        input: String,

        #[arg(help = "Output directory path")]
        output: PathBuf,

        #[arg(short = 'm', long, help = "Byte budget for each result (default: 512000)")]
        max_bytes: Option<u64>,

        #[arg(
            short = 'j',
            long,
            help = "Number of parallel threads (default: auto)",
            long_help = "Number of threads for parallel batch processing. \
                         If not specified, uses number of CPU cores."
        )]
        threads: Option<usize>,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively"
        )]
        recursive: bool,
    },

    #[command(
        about = "Compress and store an image as a station upload",
        long_about = "Run the admin upload flow for one file: validate the extension, compress, \
                      write to <root>/uploads/stations/<station>/<uuid>.<ext> and print the public URL."
    )]
    Store {
        #[arg(help = "Image file to upload")]
        input: PathBuf,

        #[arg(long, help = "Web root that contains the uploads directory")]
        root: PathBuf,

        #[arg(short = 's', long, help = "Station id the photo belongs to")]
        station: u32,

        #[arg(short = 'm', long, help = "Byte budget for the result (default: 512000)")]
        max_bytes: Option<u64>,
    },

    #[command(
        about = "Show how an image would be compressed",
        long_about = "Display dimensions, size, transparency and the target format the compressor \
                      would choose for the file."
    )]
    Info {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,

        #[arg(short = 'm', long, help = "Byte budget to compare against (default: 512000)")]
        max_bytes: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_store() {
        let args = Args::try_parse_from([
            "tour-media", "store", "a.png", "--root", "/srv", "--station", "4", "-m", "1000",
        ])
        .unwrap();
        match args.command {
            Commands::Store {
                input,
                root,
                station,
                max_bytes,
            } => {
                assert_eq!(input, PathBuf::from("a.png"));
                assert_eq!(root, PathBuf::from("/srv"));
                assert_eq!(station, 4);
                assert_eq!(max_bytes, Some(1000));
            }
            _ => panic!("expected store command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["tour-media", "info", "x.jpg", "-q"]).unwrap();
        assert!(args.quiet);
        assert!(!args.verbose);
    }

    #[test]
    fn test_parse_info_budget() {
        let args = Args::try_parse_from(["tour-media", "info", "x.jpg", "-m", "2048"]).unwrap();
        match args.command {
            Commands::Info { max_bytes, .. } => assert_eq!(max_bytes, Some(2048)),
            _ => panic!("expected info command"),
        }
    }
}
