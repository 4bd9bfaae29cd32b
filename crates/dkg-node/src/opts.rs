use gumdrop::Options;

/// Command-line surface for a single DKG round. There is no subcommand tree
/// here — unlike the source this was distilled from, a node does exactly one
/// thing (run a round against a pre-deployed, pre-started contract) and
/// exits.
#[derive(Debug, Options, Clone)]
pub struct NodeOpts {
    help: bool,

    #[options(help = "path to the node's JSON configuration file", default = "config.json")]
    pub config: String,

    #[options(
        help = "optional named pipe to which the prover's job id is written after each proof",
        meta = "PATH"
    )]
    pub id_pipe: Option<String>,

    #[options(help = "broadcast invalid commitments, to exercise the dispute path")]
    pub rogue: bool,

    #[options(help = "never file a disputeShare transaction, even against an invalid broadcast")]
    pub ignore_invalid: bool,

    #[options(help = "exit with code 0 right after broadcastShares is mined")]
    pub broadcast_only: bool,
}
