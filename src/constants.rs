/// NCBI E-utilities endpoints and run defaults shared across the crate

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const ESEARCH_ENDPOINT: &str = "esearch.fcgi";
pub const EFETCH_ENDPOINT: &str = "efetch.fcgi";

pub const NUCLEOTIDE_DB: &str = "nucleotide";
pub const DEFAULT_TOOL: &str = "seq_retriever";

// NCBI allows 3 requests/second anonymously and 10 with an API key
pub const REQUESTS_PER_SEC_ANONYMOUS: u32 = 3;
pub const REQUESTS_PER_SEC_WITH_KEY: u32 = 10;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_RECORDS: usize = 1000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MAX_TRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 15_000;

pub const DEFAULT_CONFIG_FILE: &str = "seq_retriever.toml";

/// CSV output name for a taxonomy id
pub fn csv_file_name(taxid: &str) -> String {
    format!("taxid_{taxid}_filtered.csv")
}

/// Plot output name for a taxonomy id and image extension
pub fn plot_file_name(taxid: &str, extension: &str) -> String {
    format!("taxid_{taxid}_plot.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_taxid() {
        assert_eq!(csv_file_name("9606"), "taxid_9606_filtered.csv");
        assert_eq!(plot_file_name("9606", "png"), "taxid_9606_plot.png");
        assert_eq!(plot_file_name("2697049", "svg"), "taxid_2697049_plot.svg");
    }
}
