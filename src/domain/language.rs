use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
    Es,
    It,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::De,
        Language::Fr,
        Language::Es,
        Language::It,
    ];

    /// Strict parse for user input: only the allowlisted codes are accepted.
    pub fn parse(s: &str) -> Result<Language, String> {
        Self::from_code(s.trim()).ok_or_else(|| {
            format!(
                "'{}' is not a supported language. Use one of: en, de, fr, es, it.",
                s
            )
        })
    }

    /// Lenient detection for locale-like strings such as `de-CH` or `FR`.
    pub fn detect(s: &str) -> Option<Language> {
        let normalized = s.trim().to_lowercase();
        let base = normalized.get(..2)?;
        Self::from_code(base)
    }

    /// Picks the first supported language of an `Accept-Language` header.
    pub fn from_accept_language(header: &str) -> Option<Language> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .find_map(Language::detect)
    }

    fn from_code(code: &str) -> Option<Language> {
        match code.to_lowercase().as_str() {
            "en" => Some(Language::En),
            "de" => Some(Language::De),
            "fr" => Some(Language::Fr),
            "es" => Some(Language::Es),
            "it" => Some(Language::It),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::It => "it",
        }
    }

    /// Looks up a page label, falling back to English and then to the key itself.
    pub fn t(&self, key: &'static str) -> &'static str {
        lookup(translations(*self), key)
            .or_else(|| lookup(translations(Language::En), key))
            .unwrap_or(key)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn translations(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::En => &[
            ("title", "Refuge Availability"),
            ("last_updated", "Last updated"),
            ("places", "places"),
            ("full", "Full"),
            ("no_data", "No dates have been collected yet."),
            ("chat_id", "Telegram Chat ID"),
            ("language", "Language"),
            ("refuge", "Refuge"),
            ("any_refuge", "Any"),
            ("date_from", "From date"),
            ("date_to", "To date"),
            ("submit", "Submit"),
            ("hero_title", "Free spots in Mont Blanc refuges, in real time"),
            ("hero_subtitle", "No more daily checks. We'll notify you when spots appear."),
            ("cta_subscribe", "Subscribe to alerts"),
            ("demo_title", "Live availability"),
            ("chat_id_how", "Don't know your Chat ID? Open the bot and send /id"),
        ],
        Language::De => &[
            ("title", "Hüttenverfügbarkeit"),
            ("last_updated", "Zuletzt aktualisiert"),
            ("places", "Plätze"),
            ("full", "Ausgebucht"),
            ("no_data", "Noch keine Daten erfasst."),
            ("chat_id", "Telegram Chat-ID"),
            ("language", "Sprache"),
            ("refuge", "Hütte"),
            ("any_refuge", "Alle"),
            ("date_from", "Von Datum"),
            ("date_to", "Bis Datum"),
            ("submit", "Senden"),
            ("hero_title", "Freie Plätze in Mont-Blanc-Hütten in Echtzeit"),
            ("hero_subtitle", "Keine täglichen Checks mehr. Wir benachrichtigen Sie, wenn Plätze frei werden."),
            ("cta_subscribe", "Benachrichtigungen abonnieren"),
            ("demo_title", "Live-Verfügbarkeit"),
            ("chat_id_how", "Chat-ID unbekannt? Öffne den Bot und sende /id"),
        ],
        Language::Fr => &[
            ("title", "Disponibilité des refuges"),
            ("last_updated", "Dernière mise à jour"),
            ("places", "places"),
            ("full", "Complet"),
            ("no_data", "Aucune date collectée pour le moment."),
            ("chat_id", "ID de chat Telegram"),
            ("language", "Langue"),
            ("refuge", "Refuge"),
            ("any_refuge", "Tous"),
            ("date_from", "Date de début"),
            ("date_to", "Date de fin"),
            ("submit", "Envoyer"),
            ("hero_title", "Places libres dans les refuges du Mont Blanc, en temps réel"),
            ("hero_subtitle", "Fini les vérifications quotidiennes. Nous vous prévenons dès qu'une place se libère."),
            ("cta_subscribe", "S'abonner aux alertes"),
            ("demo_title", "Disponibilité en direct"),
            ("chat_id_how", "Vous ne connaissez pas votre Chat ID ? Ouvrez le bot et envoyez /id"),
        ],
        Language::Es => &[
            ("title", "Disponibilidad de refugios"),
            ("last_updated", "Última actualización"),
            ("places", "plazas"),
            ("full", "Completo"),
            ("no_data", "Todavía no hay fechas."),
            ("chat_id", "ID de chat de Telegram"),
            ("language", "Idioma"),
            ("refuge", "Refugio"),
            ("any_refuge", "Cualquiera"),
            ("date_from", "Desde"),
            ("date_to", "Hasta"),
            ("submit", "Enviar"),
            ("hero_title", "Plazas libres en refugios del Mont Blanc, en tiempo real"),
            ("hero_subtitle", "Olvídate de revisar a diario. Te avisamos cuando aparezcan plazas."),
            ("cta_subscribe", "Suscribirse a alertas"),
            ("demo_title", "Disponibilidad en vivo"),
            ("chat_id_how", "¿No conoces tu Chat ID? Abre el bot y envía /id"),
        ],
        Language::It => &[
            ("title", "Disponibilità rifugi"),
            ("last_updated", "Ultimo aggiornamento"),
            ("places", "posti"),
            ("full", "Completo"),
            ("no_data", "Nessuna data raccolta finora."),
            ("chat_id", "ID chat Telegram"),
            ("language", "Lingua"),
            ("refuge", "Rifugio"),
            ("any_refuge", "Qualsiasi"),
            ("date_from", "Dal"),
            ("date_to", "Al"),
            ("submit", "Invia"),
            ("hero_title", "Posti liberi nei rifugi del Monte Bianco, in tempo reale"),
            ("hero_subtitle", "Basta controlli quotidiani. Ti avvisiamo quando si liberano posti."),
            ("cta_subscribe", "Iscriviti agli avvisi"),
            ("demo_title", "Disponibilità live"),
            ("chat_id_how", "Non conosci il tuo Chat ID? Apri il bot e invia /id"),
        ],
    }
}
