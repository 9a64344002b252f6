//! Static markup corpora used across harnesses.
//!
//! Colours are the client's real ones: `#c8ffc8`/`#ffffff` general,
//! `#64ff64` whisper, `#f7b73c` team, `#94ddfa` club, `#ff64ff` system,
//! `#c896c8` shout.

/// Realistic excerpt of a chat log: one pair per line, as the client writes it.
pub const LOG_EXCERPT: &str = concat!(
    "<html><body>\n",
    r##"<font>[14:02:31]</font><font color="#c8ffc8">Hello everyone</font><br>"##, "\n",
    r##"<font>[14:02:35]</font><font color="#64ff64">Alice&gt;&gt; are you there?</font><br>"##, "\n",
    r##"<font>[14:02:40]</font><font color="#ff64ff">経験値が1200増加しました。</font><br>"##, "\n",
    r##"<font>[14:02:41]</font><font color="#f7b73c">team: boss at north gate</font><br>"##, "\n",
    r##"<font>[14:02:45]</font><font color="#000000">[GM] maintenance at 18:00</font><br>"##, "\n",
    r##"<font>[14:02:50]</font><font color="#94ddfa">club: spam offer today</font><br>"##, "\n",
    r##"<font>[14:02:55]</font><font color="#c896c8">WTS rare sword</font><br>"##, "\n",
    r##"<font>[14:03:00]</font><font color="#FFFFFF">old white general</font><br>"##, "\n",
);

/// Number of events [`LOG_EXCERPT`] yields with the standard registry and
/// noise filter (one noise line, one unregistered colour).
pub const LOG_EXCERPT_EVENTS: usize = 6;

/// Malformed spans mixed with good ones.
pub const MALFORMED: &str = concat!(
    r##"<font>1</font><font>no colour attribute</font>"##,
    r##"<font>2</font><font color="">empty colour</font>"##,
    r##"<font>3</font><font color="#c8ffc8">   </font>"##,
    r##"<font>4</font><font color="#c8ffc8">survivor</font>"##,
    r##"<font>5</font><font color="not-a-colour">bad</font>"##,
);

/// Noise lines, one per standard prefix.
pub const NOISE_LINES: &[&str] = &[
    "経験値が増加した",
    "ルーン経験値が300増加しました。",
    "[ELSO] 50 獲得",
    "ペットが経験値を獲得しました。",
];
