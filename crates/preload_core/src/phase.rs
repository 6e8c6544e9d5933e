use std::fmt;

/// Internal sync phase reported by the node while it catches up.
///
/// Declaration order is the comparison order; the terminal-phase guard and the
/// display step mapping both depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SyncPhase {
    #[default]
    ActionExecution,
    BlockDownload,
    BlockHashDownload,
    BlockVerification,
    StateDownload,
}

impl SyncPhase {
    pub const ALL: [SyncPhase; 5] = [
        SyncPhase::ActionExecution,
        SyncPhase::BlockDownload,
        SyncPhase::BlockHashDownload,
        SyncPhase::BlockVerification,
        SyncPhase::StateDownload,
    ];

    /// Position in the enumeration, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Resolves the node's phase name. Both the node's `...State` spelling and the
    /// bare variant name are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let bare = name.strip_suffix("State").unwrap_or(name);
        Self::ALL.into_iter().find(|phase| phase.name() == bare)
    }

    pub fn name(self) -> &'static str {
        match self {
            SyncPhase::ActionExecution => "ActionExecution",
            SyncPhase::BlockDownload => "BlockDownload",
            SyncPhase::BlockHashDownload => "BlockHashDownload",
            SyncPhase::BlockVerification => "BlockVerification",
            SyncPhase::StateDownload => "StateDownload",
        }
    }

    /// Phases in which a finished preload is trusted even with peers configured.
    pub fn is_settled(self) -> bool {
        matches!(self, SyncPhase::ActionExecution | SyncPhase::StateDownload)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Work counters attached to a [`SyncPhase`]. `total == 0` means the total is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCounters {
    pub current: u64,
    pub total: u64,
}

impl SyncCounters {
    pub fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }

    /// Whole percent of `current / total`, rounded down and capped at 100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = u128::from(self.current) * 100 / u128::from(self.total);
        pct.min(100) as u8
    }
}
