use ratatui::style::Color;

pub const COLORS: [Color; 12] = [
    Color::Rgb(0, 176, 80),
    Color::Rgb(128, 255, 0),
    Color::Rgb(255, 255, 0),
    Color::Rgb(255, 204, 0),
    Color::Rgb(255, 153, 0),
    Color::Rgb(255, 51, 0),
    Color::Rgb(255, 0, 0),
    Color::Rgb(153, 0, 255),
    Color::Rgb(102, 51, 255),
    Color::Rgb(0, 0, 255),
    Color::Rgb(0, 153, 255),
    Color::Rgb(0, 255, 255),
];

pub const TIME_SETTINGS: TimeSettings = TimeSettings { tick_ms: 1000 };

pub const FILE_PATHS: FilePaths = FilePaths {
    record: "category-stopwatch-v1.json",
    config: "config.json",
    backups: "backups",
    logs: "logs",
};

pub const PROJECT_DIRS: ProjectNames = ProjectNames {
    qualifier: "com",
    organization: "category-stopwatch",
    application: "category-stopwatch",
};

pub const RECENT_SESSIONS_LIMIT: usize = 20;
pub const MAX_BACKUPS: usize = 10;
pub const UNTITLED_CATEGORY: &str = "Untitled";

pub struct TimeSettings {
    pub tick_ms: u64,
}

pub struct FilePaths {
    pub record: &'static str,
    pub config: &'static str,
    pub backups: &'static str,
    pub logs: &'static str,
}

pub struct ProjectNames {
    pub qualifier: &'static str,
    pub organization: &'static str,
    pub application: &'static str,
}
