/// Every command the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    Tag,
    Ban,
    Unban,
    Kick,
    Mute,
    Unmute,
    Warn,
    Unwarn,
    Warns,
    SetWarn,
    Antilink,
    Slowmode,
    Block,
    Unblock,
    Words,
    Welcome,
    Goodbye,
    SetWelcome,
    SetGoodbye,
    Close,
    Open,
    Delete,
    Promote,
    Demote,
    Rps,
    Slot,
    Guess,
    EightBall,
    Choice,
    Sticker,
    Uptime,
    BotInfo,
    Balance,
    Daily,
    Work,
    Deposit,
    Withdraw,
    Level,
    Leaderboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Anyone,
    Group,
    GroupAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    None,
    Optional,
    Required,
    /// One or more users, by mention or by quoting their message.
    Users,
}

pub struct CommandDef {
    pub command: Command,
    pub names: &'static [&'static str],
    pub permission: Permission,
    pub args: ArgShape,
    /// Persist the store once the handler has run.
    pub mutates: bool,
    pub usage: &'static str,
    pub description: &'static str,
}

const fn def(
    command: Command,
    names: &'static [&'static str],
    permission: Permission,
    args: ArgShape,
    mutates: bool,
    usage: &'static str,
    description: &'static str,
) -> CommandDef {
    CommandDef {
        command,
        names,
        permission,
        args,
        mutates,
        usage,
        description,
    }
}

use ArgShape as A;
use Command as C;
use Permission as P;

pub static COMMANDS: &[CommandDef] = &[
    def(C::Menu, &["menu", "help"], P::Anyone, A::None, false, "menu", "Mostra questo menu"),
    def(C::Tag, &["tag", "tagall"], P::GroupAdmin, A::Optional, false, "tag [testo]", "Menziona tutti i membri"),
    def(C::Ban, &["ban"], P::GroupAdmin, A::Users, true, "ban @utente", "Banna un utente"),
    def(C::Unban, &["unban"], P::GroupAdmin, A::Users, true, "unban @utente", "Rimuove il ban"),
    def(C::Kick, &["kick", "remove"], P::GroupAdmin, A::Users, true, "kick @utente", "Rimuove un utente dal gruppo"),
    def(C::Mute, &["muta", "mute"], P::GroupAdmin, A::Users, true, "muta @utente", "Silenzia un utente"),
    def(C::Unmute, &["smuta", "unmute"], P::GroupAdmin, A::Users, true, "smuta @utente", "Toglie il silenzio"),
    def(C::Warn, &["warn"], P::GroupAdmin, A::Users, true, "warn @utente", "Avverte un utente"),
    def(C::Unwarn, &["unwarn"], P::GroupAdmin, A::Users, true, "unwarn @utente", "Toglie un avvertimento"),
    def(C::Warns, &["warns"], P::Group, A::Optional, false, "warns [@utente]", "Mostra gli avvertimenti"),
    def(C::SetWarn, &["setwarn"], P::GroupAdmin, A::Required, true, "setwarn <n>", "Soglia di avvertimenti per la rimozione"),
    def(C::Antilink, &["antilink"], P::GroupAdmin, A::Optional, true, "antilink [on|off]", "Blocca i link"),
    def(C::Slowmode, &["slowmode"], P::GroupAdmin, A::Optional, true, "slowmode <secondi|off>", "Limita la frequenza dei messaggi"),
    def(C::Block, &["blocca"], P::GroupAdmin, A::Required, true, "blocca <parola>", "Blocca una parola"),
    def(C::Unblock, &["sblocca"], P::GroupAdmin, A::Required, true, "sblocca <parola>", "Sblocca una parola"),
    def(C::Words, &["parole"], P::GroupAdmin, A::None, false, "parole", "Elenca le parole bloccate"),
    def(C::Welcome, &["benvenuto"], P::GroupAdmin, A::Optional, true, "benvenuto [on|off]", "Messaggio di benvenuto"),
    def(C::Goodbye, &["addio"], P::GroupAdmin, A::Optional, true, "addio [on|off]", "Messaggio di addio"),
    def(C::SetWelcome, &["setbenvenuto"], P::GroupAdmin, A::Required, true, "setbenvenuto <testo>", "Imposta il benvenuto ({user}, {group})"),
    def(C::SetGoodbye, &["setaddio"], P::GroupAdmin, A::Required, true, "setaddio <testo>", "Imposta l'addio ({user}, {group})"),
    def(C::Close, &["chiudi"], P::GroupAdmin, A::None, true, "chiudi", "Solo gli admin possono scrivere"),
    def(C::Open, &["apri"], P::GroupAdmin, A::None, true, "apri", "Tutti possono scrivere"),
    def(C::Delete, &["r"], P::GroupAdmin, A::None, false, "r (in risposta)", "Elimina il messaggio citato"),
    def(C::Promote, &["p", "promuovi"], P::GroupAdmin, A::Users, false, "p @utente", "Promuove ad admin"),
    def(C::Demote, &["d", "degrada"], P::GroupAdmin, A::Users, false, "d @utente", "Rimuove da admin"),
    def(C::Rps, &["rps"], P::Anyone, A::Required, false, "rps <sasso|carta|forbici>", "Sasso, carta, forbici"),
    def(C::Slot, &["slot"], P::Anyone, A::None, true, "slot", "Slot machine"),
    def(C::Guess, &["indovina"], P::Anyone, A::Required, true, "indovina <1-100>", "Indovina il numero"),
    def(C::EightBall, &["8ball"], P::Anyone, A::Required, false, "8ball <domanda>", "La palla magica risponde"),
    def(C::Choice, &["scelta"], P::Anyone, A::Required, false, "scelta a|b|c", "Sceglie per te"),
    def(C::Sticker, &["s", "sticker"], P::Anyone, A::None, false, "s (con immagine)", "Crea uno sticker"),
    def(C::Uptime, &["uptime"], P::Anyone, A::None, false, "uptime", "Da quanto sono attivo"),
    def(C::BotInfo, &["info-bot"], P::Anyone, A::None, false, "info-bot", "Informazioni sul bot"),
    def(C::Balance, &["saldo"], P::Anyone, A::None, false, "saldo", "Il tuo portafoglio"),
    def(C::Daily, &["daily"], P::Anyone, A::None, true, "daily", "Ricompensa giornaliera"),
    def(C::Work, &["lavora"], P::Anyone, A::None, true, "lavora", "Lavora per guadagnare"),
    def(C::Deposit, &["deposita"], P::Anyone, A::Required, true, "deposita <n|tutto>", "Deposita in banca"),
    def(C::Withdraw, &["preleva"], P::Anyone, A::Required, true, "preleva <n|tutto>", "Preleva dalla banca"),
    def(C::Level, &["livello"], P::Anyone, A::None, false, "livello", "Il tuo livello"),
    def(C::Leaderboard, &["classifica"], P::Anyone, A::None, false, "classifica", "I più attivi"),
];

pub fn lookup(name: &str) -> Option<&'static CommandDef> {
    let name = name.to_lowercase();
    COMMANDS.iter().find(|c| c.names.contains(&name.as_str()))
}

/// Splits a prefixed line into the lowercased command word and its arguments.
pub fn parse_command<'a>(text: &'a str, prefix: &str) -> Option<(String, Vec<&'a str>)> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let mut words = body.split_whitespace();
    let name = words.next()?.to_lowercase();
    Some((name, words.collect()))
}
