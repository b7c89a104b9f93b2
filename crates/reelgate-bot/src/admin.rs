//! Operator command surface — single-message commands only, no multi-step
//! wizards. Content for media broadcasts rides along as the photo/video the
//! command is captioned on.

use chrono::{Duration as CivilDuration, NaiveDate};

use reelgate_core::civil::{
    parse_buttons, parse_civil_date, parse_civil_time, parse_required_channels,
};
use reelgate_core::error::{ReelgateError, Result};
use reelgate_core::types::{BroadcastJob, BroadcastPayload, JobPatch};
use reelgate_gateway::Message;

use crate::runtime::BotRuntime;

const HELP: &str = "\
<b>Broadcasts</b>
/schedule &lt;date&gt; &lt;time&gt; — schedule the rest of the message (or the attached media)
/pending — list scheduled broadcasts
/preview &lt;id&gt; — render a scheduled broadcast here
/edittext &lt;id&gt; — replace the text (body below the command)
/editmedia &lt;id&gt; — replace content with the attached media
/edittime &lt;id&gt; &lt;date&gt; &lt;time&gt; — move a broadcast
/editbuttons &lt;id&gt; — replace buttons (label | url per line; `none` clears)
/sendnow &lt;id&gt; — deliver a scheduled broadcast immediately
/cancel &lt;id&gt; — cancel and delete a broadcast
/broadcast — deliver the rest of the message to everyone right now

<b>Catalog</b>
/addfilm &lt;code|auto&gt; | &lt;title&gt; — add an entry (attach a photo for a poster)
/delfilm &lt;code&gt; — remove an entry
/films — list entries

<b>Gate &amp; copy</b>
/addchannels — add required channels, `Name (link) [chat-id]` per line
/channels — list required channels
/delchannel &lt;id&gt; — remove one required channel
/clearchannels — remove all required channels
/settext &lt;key&gt; — set bot copy (value below the command)
/texts — list copy keys
/setlink &lt;url&gt; — set the instruction link
/setwelcomeimage — set the welcome image to the attached photo (`none` clears)
/stats — audience counters";

/// Entry point for operator messages starting with `/`.
pub async fn handle_command(bot: &BotRuntime, message: &Message, text: &str) -> Result<()> {
    let chat_id = message.chat.id;
    let (head, body) = split_body(text);
    let (command, rest) = head
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((head, ""));

    let outcome = dispatch(bot, message, command, rest, body).await;
    match outcome {
        Ok(reply) => {
            if !reply.is_empty() {
                bot.gateway.send_message(chat_id, &reply, None).await?;
            }
            Ok(())
        }
        Err(ReelgateError::Validation(reason)) => {
            bot.gateway
                .send_message(chat_id, &format!("⚠️ {reason}"), None)
                .await
        }
        Err(e) => {
            tracing::warn!("operator command {command} failed: {e}");
            bot.gateway
                .send_message(chat_id, &format!("❌ Command failed: {e}"), None)
                .await
        }
    }
}

async fn dispatch(
    bot: &BotRuntime,
    message: &Message,
    command: &str,
    rest: &str,
    body: String,
) -> Result<String> {
    match command {
        "/admin" | "/help" => Ok(HELP.to_string()),
        "/stats" => Ok(stats(bot)),
        "/schedule" => schedule(bot, message, rest, body).await,
        "/pending" => Ok(pending(bot)),
        "/preview" => preview(bot, message.chat.id, rest).await,
        "/edittext" => edit_text(bot, rest, body),
        "/editmedia" => edit_media(bot, message, rest, body),
        "/edittime" => edit_time(bot, rest),
        "/editbuttons" => edit_buttons(bot, rest, body),
        "/sendnow" => send_now(bot, rest).await,
        "/cancel" => cancel(bot, rest),
        "/broadcast" => broadcast_now(bot, message, rest, body).await,
        "/addfilm" => add_film(bot, message, rest, body),
        "/delfilm" => del_film(bot, rest),
        "/films" => Ok(films(bot)),
        "/addchannels" => add_channels(bot, rest, body),
        "/channels" => Ok(channels(bot)),
        "/delchannel" => del_channel(bot, rest),
        "/clearchannels" => {
            bot.channels.clear();
            Ok("🗑 Required channels cleared.".into())
        }
        "/settext" => set_text(bot, rest, body),
        "/texts" => Ok(format!("Copy keys: {}", bot.texts.text_keys().join(", "))),
        "/setlink" => set_link(bot, rest),
        "/setwelcomeimage" => set_welcome_image(bot, message, rest),
        _ => Err(ReelgateError::validation("unknown command, see /help")),
    }
}

// ─── Broadcast commands ──────────────────────────────────────

async fn schedule(
    bot: &BotRuntime,
    message: &Message,
    rest: &str,
    body: String,
) -> Result<String> {
    let mut args = rest.split_whitespace();
    let (date_arg, time_arg) = match (args.next(), args.next()) {
        (Some(d), Some(t)) => (d, t),
        _ => {
            return Err(ReelgateError::validation(
                "usage: /schedule <date> <time>, content below the command",
            ));
        }
    };
    let date = parse_date_arg(bot, date_arg)?;
    let time = parse_civil_time(time_arg)?;
    let payload = payload_from(message, body)?;

    let id = bot.console.create_job(payload, Vec::new(), date, time)?;
    if let Some(Err(e)) = bot.console.preview_job(bot.operator_chat_id, id).await {
        tracing::debug!("preview for job {id} not delivered: {e}");
    }
    Ok(format!(
        "✅ Broadcast #{id} scheduled for {} {}.",
        date.format("%d.%m.%Y"),
        time.format("%H:%M")
    ))
}

fn pending(bot: &BotRuntime) -> String {
    let jobs = bot.console.list_pending_jobs();
    if jobs.is_empty() {
        return "No scheduled broadcasts.".into();
    }
    let lines: Vec<String> = jobs.iter().map(describe_job).collect();
    format!("<b>Scheduled broadcasts</b>\n{}", lines.join("\n"))
}

fn describe_job(job: &BroadcastJob) -> String {
    format!(
        "#{} • {} {} • {}{}",
        job.id,
        job.date.format("%d.%m.%Y"),
        job.time.format("%H:%M"),
        job.payload.kind(),
        if job.buttons.is_empty() {
            String::new()
        } else {
            format!(" • {} buttons", job.buttons.len())
        }
    )
}

async fn preview(bot: &BotRuntime, chat_id: i64, rest: &str) -> Result<String> {
    let id = parse_id(rest)?;
    match bot.console.preview_job(chat_id, id).await {
        Some(Ok(())) => Ok(String::new()),
        Some(Err(e)) => Err(e),
        None => Err(ReelgateError::validation(format!("no broadcast #{id}"))),
    }
}

fn edit_text(bot: &BotRuntime, rest: &str, body: String) -> Result<String> {
    let id = parse_id(rest)?;
    require_job(bot, id)?;
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(ReelgateError::validation(
            "usage: /edittext <id>, new text below the command",
        ));
    }
    bot.console.edit_job(
        id,
        JobPatch {
            payload: Some(BroadcastPayload::Text { text: body }),
            ..Default::default()
        },
    );
    Ok(format!("✏️ Broadcast #{id} text updated."))
}

fn edit_media(bot: &BotRuntime, message: &Message, rest: &str, body: String) -> Result<String> {
    let id = parse_id(rest)?;
    require_job(bot, id)?;
    if message.video.is_none() && message.photo.is_none() {
        return Err(ReelgateError::validation(
            "attach the new photo or video with /editmedia <id> as its caption",
        ));
    }
    let payload = payload_from(message, body)?;
    bot.console.edit_job(
        id,
        JobPatch {
            payload: Some(payload),
            ..Default::default()
        },
    );
    Ok(format!("✏️ Broadcast #{id} media updated."))
}

fn edit_time(bot: &BotRuntime, rest: &str) -> Result<String> {
    let mut args = rest.split_whitespace();
    let id = parse_id(args.next().unwrap_or_default())?;
    require_job(bot, id)?;
    let (date_arg, time_arg) = match (args.next(), args.next()) {
        (Some(d), Some(t)) => (d, t),
        _ => {
            return Err(ReelgateError::validation(
                "usage: /edittime <id> <date> <time>",
            ));
        }
    };
    let date = parse_date_arg(bot, date_arg)?;
    let time = parse_civil_time(time_arg)?;
    bot.console.edit_job(
        id,
        JobPatch {
            date: Some(date),
            time: Some(time),
            ..Default::default()
        },
    );
    Ok(format!(
        "⏰ Broadcast #{id} moved to {} {}.",
        date.format("%d.%m.%Y"),
        time.format("%H:%M")
    ))
}

fn edit_buttons(bot: &BotRuntime, rest: &str, body: String) -> Result<String> {
    let mut args = rest.split_whitespace();
    let id = parse_id(args.next().unwrap_or_default())?;
    require_job(bot, id)?;

    let buttons = if args.next() == Some("none") {
        Vec::new()
    } else {
        let parsed = parse_buttons(&body);
        if parsed.is_empty() {
            return Err(ReelgateError::validation(
                "usage: /editbuttons <id> with `label | url` lines below, or /editbuttons <id> none",
            ));
        }
        parsed
    };
    let count = buttons.len();
    bot.console.edit_job(
        id,
        JobPatch {
            buttons: Some(buttons),
            ..Default::default()
        },
    );
    Ok(format!("🔘 Broadcast #{id} now has {count} buttons."))
}

async fn send_now(bot: &BotRuntime, rest: &str) -> Result<String> {
    let id = parse_id(rest)?;
    match bot.console.fire_now(id).await {
        Some(outcome) => Ok(format!(
            "✅ Broadcast #{id} delivered.\n📨 Sent: {}\n❌ Failed: {}",
            outcome.delivered, outcome.failed
        )),
        None => Err(ReelgateError::validation(format!(
            "broadcast #{id} not found or already completed"
        ))),
    }
}

fn cancel(bot: &BotRuntime, rest: &str) -> Result<String> {
    let id = parse_id(rest)?;
    if bot.console.cancel_job(id) {
        Ok(format!("🗑 Broadcast #{id} cancelled."))
    } else {
        Ok(format!("Broadcast #{id} was already gone."))
    }
}

async fn broadcast_now(
    bot: &BotRuntime,
    message: &Message,
    _rest: &str,
    body: String,
) -> Result<String> {
    let payload = payload_from(message, body)?;
    let outcome = bot.console.send_immediate(&payload, &[]).await;
    Ok(format!(
        "✅ Broadcast delivered.\n📨 Sent: {}\n❌ Failed: {}",
        outcome.delivered, outcome.failed
    ))
}

// ─── Catalog commands ──────────────────────────────────────

fn add_film(bot: &BotRuntime, message: &Message, rest: &str, body: String) -> Result<String> {
    // Title may follow on the command line or in the body (media captions).
    let spec = if rest.contains('|') {
        rest.to_string()
    } else {
        format!("{rest} | {body}")
    };
    let (code, title) = spec
        .split_once('|')
        .map(|(c, t)| (c.trim().to_string(), t.trim().to_string()))
        .ok_or_else(|| ReelgateError::validation("usage: /addfilm <code|auto> | <title>"))?;
    if title.is_empty() {
        return Err(ReelgateError::validation("usage: /addfilm <code|auto> | <title>"));
    }

    let code = if code == "auto" || code.is_empty() {
        bot.catalog.unique_code()?
    } else if code.chars().all(|c| c.is_ascii_digit()) {
        code
    } else {
        return Err(ReelgateError::validation("catalog codes are digits only"));
    };

    bot.catalog.add(&code, &title, message.media_ref())?;
    Ok(format!("🎬 Added <b>{title}</b> with code <code>{code}</code>."))
}

fn del_film(bot: &BotRuntime, rest: &str) -> Result<String> {
    let code = rest.trim();
    if code.is_empty() {
        return Err(ReelgateError::validation("usage: /delfilm <code>"));
    }
    if bot.catalog.remove(code) {
        Ok(format!("🗑 Removed entry {code}."))
    } else {
        Ok(format!("No entry with code {code}."))
    }
}

fn films(bot: &BotRuntime) -> String {
    let entries = bot.catalog.all();
    if entries.is_empty() {
        return "The catalog is empty.".into();
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|e| format!("<code>{}</code> — {}", e.code, e.title))
        .collect();
    format!("<b>Catalog ({})</b>\n{}", entries.len(), lines.join("\n"))
}

// ─── Gate & copy commands ──────────────────────────────────────

fn add_channels(bot: &BotRuntime, rest: &str, body: String) -> Result<String> {
    let source = if body.trim().is_empty() {
        rest.to_string()
    } else {
        body
    };
    let specs = parse_required_channels(&source);
    if specs.is_empty() {
        return Err(ReelgateError::validation(
            "usage: /addchannels with `Name (https://link) [chat-id]` lines below",
        ));
    }
    for spec in &specs {
        bot.channels.add(spec)?;
    }
    Ok(format!("📢 Added {} required channels.", specs.len()))
}

fn channels(bot: &BotRuntime) -> String {
    let channels = bot.channels.all();
    if channels.is_empty() {
        return "No required channels — the gate is open.".into();
    }
    let lines: Vec<String> = channels
        .iter()
        .map(|c| {
            format!(
                "{} • {} • {}",
                c.id,
                c.label,
                c.channel_id.as_deref().unwrap_or("keyboard-only")
            )
        })
        .collect();
    format!("<b>Required channels</b>\n{}", lines.join("\n"))
}

fn del_channel(bot: &BotRuntime, rest: &str) -> Result<String> {
    let id = parse_id(rest)?;
    if bot.channels.remove(id) {
        Ok(format!("🗑 Required channel {id} removed."))
    } else {
        Ok(format!("No required channel {id}."))
    }
}

fn set_text(bot: &BotRuntime, rest: &str, body: String) -> Result<String> {
    let key = rest.trim();
    let value = body.trim();
    if key.is_empty() || value.is_empty() {
        return Err(ReelgateError::validation(
            "usage: /settext <key>, new copy below the command",
        ));
    }
    bot.texts.set_text(key, value)?;
    Ok(format!("📝 Copy {key:?} updated."))
}

fn set_link(bot: &BotRuntime, rest: &str) -> Result<String> {
    let url = rest.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ReelgateError::validation("usage: /setlink <https://...>"));
    }
    bot.texts.set_setting("instruction_link", Some(url))?;
    Ok("🔗 Instruction link updated.".into())
}

fn set_welcome_image(bot: &BotRuntime, message: &Message, rest: &str) -> Result<String> {
    if rest.trim() == "none" {
        bot.texts.set_setting("welcome_image", None)?;
        return Ok("🖼 Welcome image removed.".into());
    }
    match message.media_ref() {
        Some(file_ref) => {
            bot.texts.set_setting("welcome_image", Some(file_ref))?;
            Ok("🖼 Welcome image updated.".into())
        }
        None => Err(ReelgateError::validation(
            "attach a photo with /setwelcomeimage as its caption, or /setwelcomeimage none",
        )),
    }
}

fn stats(bot: &BotRuntime) -> String {
    let stats = bot.users.stats(bot.clock.offset_hours());
    format!(
        "📊 <b>Audience</b>\n\n👥 Total: {}\n📅 Today: {}\n🗓 Week: {}\n📆 Month: {}",
        stats.total, stats.today, stats.week, stats.month
    )
}

// ─── Helpers ──────────────────────────────────────

/// First line (the command and its inline args) vs everything below it.
fn split_body(text: &str) -> (&str, String) {
    match text.split_once('\n') {
        Some((head, body)) => (head.trim(), body.trim().to_string()),
        None => (text.trim(), String::new()),
    }
}

fn parse_id(arg: &str) -> Result<i64> {
    arg.trim()
        .trim_start_matches('#')
        .parse::<i64>()
        .map_err(|_| ReelgateError::validation("expected a broadcast id"))
}

fn require_job(bot: &BotRuntime, id: i64) -> Result<()> {
    bot.console
        .get_job(id)
        .map(|_| ())
        .ok_or_else(|| ReelgateError::validation(format!("no broadcast #{id}")))
}

/// `today`/`tomorrow` shortcuts on top of the civil date formats.
fn parse_date_arg(bot: &BotRuntime, arg: &str) -> Result<NaiveDate> {
    let today = bot.clock.today();
    match arg {
        "today" => Ok(today),
        "tomorrow" => Ok(today + CivilDuration::days(1)),
        other => parse_civil_date(other, today),
    }
}

/// Build the payload from the command message: attached media wins, plain
/// text otherwise.
fn payload_from(message: &Message, body: String) -> Result<BroadcastPayload> {
    if let Some(video) = &message.video {
        return Ok(BroadcastPayload::Video {
            file_ref: video.file_id.clone(),
            caption: non_empty(body),
        });
    }
    if let Some(file_ref) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        return Ok(BroadcastPayload::Photo {
            file_ref: file_ref.file_id.clone(),
            caption: non_empty(body),
        });
    }
    let text = body.trim().to_string();
    if text.is_empty() {
        return Err(ReelgateError::validation(
            "the broadcast content is empty — put it below the command or attach media",
        ));
    }
    Ok(BroadcastPayload::Text { text })
}

fn non_empty(body: String) -> Option<String> {
    let body = body.trim().to_string();
    if body.is_empty() { None } else { Some(body) }
}
