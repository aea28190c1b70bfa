use std::path::PathBuf;

xflags::xflags! {
    /// Keeps the metadata of a static HTML site in order.
    cmd finch {
        /// Rewrite every HTML document under ROOT in place.
        cmd process {
            /// The site root directory.
            required root: PathBuf
            /// Settings file. Defaults to `finch.toml` in the site root.
            optional -c, --config config: PathBuf
            /// Report what would change without writing anything.
            optional -n, --dry-run
            /// Exit with a failure status if any document failed.
            optional --strict
            /// Number of worker threads.
            optional -j, --jobs jobs: usize
            /// Stop starting new documents after this many failures.
            optional --max-failures max_failures: usize
            /// More logging; repeat for more.
            repeated -v, --verbose
            /// Only log errors.
            optional -q, --quiet
        }

        /// Write a sitemap for every HTML document under ROOT.
        cmd sitemap {
            /// The site root directory.
            required root: PathBuf
            /// Settings file. Defaults to `finch.toml` in the site root.
            optional -c, --config config: PathBuf
            /// Where to write the sitemap. Defaults to `sitemap.xml` in the site root.
            optional -o, --output output: PathBuf
            /// More logging; repeat for more.
            repeated -v, --verbose
            /// Only log errors.
            optional -q, --quiet
        }
    }
}
