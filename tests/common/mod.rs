#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use livedps::reader::SEPARATOR;

pub fn header(character: &str, started: &str) -> String {
    format!(
        "{SEPARATOR}\n  Gamelog\n  Listener: {character}\n  Session Started: {started}\n{SEPARATOR}\n"
    )
}

pub fn damage_out(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xff00ffff><b>{amount}</b> <color=0x77ffffff><font size=10>to</font> <b><color=0xffffffff>Guristas Massacrer</b><font size=10><color=0x77ffffff> - Hits\n")
}

pub fn damage_in(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xffcc0000><b>{amount}</b> <color=0x77ffffff><font size=10>from</font> <b><color=0xffffffff>Guristas Massacrer</b><font size=10><color=0x77ffffff> - Glances Off\n")
}

pub fn armor_out(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xffccff66><b>{amount}</b><color=0x77ffffff><font size=10> remote armor repaired to </font><b><color=0xffffffff>Guardian</b>\n")
}

pub fn shield_in(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xffccff66><b>{amount}</b><color=0x77ffffff><font size=10> remote shield boosted by </font><b><color=0xffffffff>Basilisk</b>\n")
}

pub fn neut_out(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xff7fffff><b>{amount} GJ</b><color=0x77ffffff><font size=10> energy neutralized </font><b><color=0xffffffff>Guristas Massacrer</b>\n")
}

pub fn nos_from(at: &str, amount: u64) -> String {
    format!("[ {at} ] (combat) <color=0xff7fffff><b>+{amount} GJ</b><color=0x77ffffff><font size=10> energy drained from </font><b><color=0xffffffff>Guristas Massacrer</b>\n")
}

pub fn notify(at: &str) -> String {
    format!("[ {at} ] (notify) Warp drive active\n")
}

pub fn write_log(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}
