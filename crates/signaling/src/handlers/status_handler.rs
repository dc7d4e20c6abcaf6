//! Status-Handler – Template- und Stat-Anfragen des Registrierungsdialogs

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use skinnygate_protocol::enums::KeyMode;
use skinnygate_protocol::messages::{
    ConfigStat, DefineTimeDate, ForwardStat, LineStat, NumberReq, SelectSoftKeys, SpeedDialStat,
    VersionRes,
};
use skinnygate_protocol::Message;

use crate::button_template::Taste;
use crate::device::Device;
use crate::handlers::HandlerContext;
use crate::indicate::ALLE_SOFTKEYS;
use crate::softkey;

/// Firmware-Kennung, wenn das Telefon keine gemeldet hat
const STANDARD_VERSION: &str = "P00308000700";

/// Anzeigeoptionen im LineStat: Name, Nummer, Label, Original-Nummer
const LINE_DISPLAY_OPTIONS: u32 = 0x0F;

async fn antworten(geraet: &Device, nachrichten: Vec<Message>) {
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "Antwort nicht gesendet");
    }
}

pub async fn handle_button_template_req(ctx: &HandlerContext) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let template = geraet.lesen().template.nachricht();
    tracing::debug!(device = %geraet.id, tasten = template.total, "ButtonTemplate");
    antworten(&geraet, vec![Message::ButtonTemplate(template)]).await;
}

pub async fn handle_softkey_template_req(ctx: &HandlerContext) {
    if let Some(geraet) = ctx.geraet() {
        antworten(
            &geraet,
            vec![Message::SoftKeyTemplateRes(softkey::template_nachricht())],
        )
        .await;
    }
}

/// Sets senden und sofort den Ruhezustand auswaehlen
pub async fn handle_softkey_set_req(ctx: &HandlerContext) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let sets = softkey::sets_nachricht(geraet.klasse());
    antworten(
        &geraet,
        vec![
            Message::SoftKeySetRes(sets),
            Message::SelectSoftKeys(SelectSoftKeys {
                line_instance: 0,
                call_reference: 0,
                key_mode: KeyMode::OnHook,
                valid_key_mask: ALLE_SOFTKEYS,
            }),
        ],
    )
    .await;
}

/// LineStat fuer eine Leitungsinstanz
pub fn line_stat(ctx: &HandlerContext, geraet: &Device, instance: u32) -> LineStat {
    let leer = LineStat {
        line_number: instance,
        dir_number: String::new(),
        display_name: String::new(),
        label: String::new(),
        display_options: LINE_DISPLAY_OPTIONS,
    };
    let Some(name) = geraet.leitung_fuer_instance(instance) else {
        return leer;
    };
    let label_taste = match geraet.lesen().template.taste(instance) {
        Some(Taste::Leitung { label, .. }) => label.clone(),
        _ => None,
    };
    let config = ctx.state.registry.leitung(&name).map(|l| l.config());
    let (display_name, label) = match config {
        Some(c) => {
            let display = if c.cid_name.is_empty() {
                c.label.clone()
            } else {
                c.cid_name.clone()
            };
            (display, label_taste.unwrap_or(c.label))
        }
        None => (String::new(), label_taste.unwrap_or_else(|| name.to_string())),
    };
    LineStat {
        dir_number: name.to_string(),
        display_name,
        label,
        ..leer
    }
}

pub async fn handle_line_stat_req(ctx: &HandlerContext, req: NumberReq) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let stat = line_stat(ctx, &geraet, req.number);
    antworten(&geraet, vec![Message::LineStat(stat)]).await;
}

pub async fn handle_speed_dial_stat_req(ctx: &HandlerContext, req: NumberReq) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let (dir_number, display_name) = geraet
        .lesen()
        .template
        .kurzwahl(req.number)
        .map(|(n, l)| (n.to_string(), l.to_string()))
        .unwrap_or_default();
    let stat = SpeedDialStat {
        number: req.number,
        dir_number,
        display_name,
    };
    antworten(&geraet, vec![Message::SpeedDialStat(stat)]).await;
}

pub async fn handle_forward_stat_req(ctx: &HandlerContext, req: NumberReq) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let stat = geraet
        .leitung_fuer_instance(req.number)
        .and_then(|name| ctx.state.registry.leitung(&name))
        .map(|line| line.weiterleitung(&geraet.id).nachricht(req.number))
        .unwrap_or(ForwardStat {
            line_number: req.number,
            all: None,
            busy: None,
            no_answer: None,
        });
    antworten(&geraet, vec![Message::ForwardStat(stat)]).await;
}

pub async fn handle_config_stat_req(ctx: &HandlerContext) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let stat = {
        let g = geraet.lesen();
        ConfigStat {
            device_name: geraet.id.to_string(),
            user_id: 0,
            instance: 1,
            user_name: g.config.beschreibung.clone(),
            server_name: ctx.state.config.server_name.clone(),
            number_lines: g.template.leitungen().count() as u32,
            number_speed_dials: g.template.kurzwahlen().count() as u32,
        }
    };
    antworten(&geraet, vec![Message::ConfigStat(stat)]).await;
}

/// DefineTimeDate fuer einen Zeitpunkt
pub fn zeit_nachricht<Tz: TimeZone>(jetzt: &DateTime<Tz>) -> DefineTimeDate {
    DefineTimeDate {
        year: jetzt.year() as u32,
        month: jetzt.month(),
        day_of_week: jetzt.weekday().num_days_from_sunday(),
        day: jetzt.day(),
        hour: jetzt.hour(),
        minute: jetzt.minute(),
        second: jetzt.second(),
        millisecond: jetzt.timestamp_subsec_millis(),
        system_time: jetzt.timestamp() as u32,
    }
}

/// Zeit wird auch ohne registriertes Geraet beantwortet
pub async fn handle_time_date_req(ctx: &HandlerContext) {
    let msg = Message::DefineTimeDate(zeit_nachricht(&chrono::Local::now()));
    if let Err(e) = ctx.session.senden(msg).await {
        tracing::debug!(session = %ctx.session.id, fehler = %e, "DefineTimeDate nicht gesendet");
    }
}

pub async fn handle_version_req(ctx: &HandlerContext) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let version = {
        let g = geraet.lesen();
        if g.firmware.is_empty() {
            STANDARD_VERSION.to_string()
        } else {
            g.firmware.clone()
        }
    };
    antworten(&geraet, vec![Message::Version(VersionRes { version })]).await;
}
