use std::{
    collections::BTreeMap,
    env,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use humg::{
    api::{ApiClient, GradeFile},
    config::Config,
    page::AnalysisPage,
    stream::{ChatRejected, Flow, Role, Stage},
    survey::{
        FileStore, KeyValueStore, PersonalField, StepOutcome, SubmitStatus, SurveyWizard,
        LIKERT_OPTIONS, SECTIONS, SOCIAL_MEDIA_OPTIONS,
    },
};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const USAGE: &str = "Usage: humg <survey | upload <file.xlsx> | analyze | summary>";

/// Typed at any survey prompt to go back one step.
const BACK: &str = "<";
/// Typed at any prompt to stop; survey progress is kept.
const QUIT: &str = "q";

enum Command {
    Survey,
    Upload(PathBuf),
    Analyze,
    Summary,
}

fn parse_command(mut args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let command = args.next().context("a command is required")?;
    match command.as_str() {
        "survey" => Ok(Command::Survey),
        "upload" => {
            let path = args.next().context("upload needs the path of a .xlsx file")?;
            Ok(Command::Upload(PathBuf::from(path)))
        }
        "analyze" => Ok(Command::Analyze),
        "summary" => Ok(Command::Summary),
        other => Err(anyhow::anyhow!("unknown command '{}'", other)),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let command = match parse_command(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", USAGE);
            return Err(e);
        }
    };

    let config = Config::from_env().context("invalid configuration")?;
    let client = ApiClient::new(&config);

    match command {
        Command::Survey => run_survey(&config, &client),
        Command::Upload(path) => run_upload(&client, &path),
        Command::Analyze => run_analyze(&client),
        Command::Summary => run_summary(&client),
    }
}

/// One trimmed line from stdin, `None` once input is exhausted.
fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    print!("{} ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok((read > 0).then(|| line.trim().to_string()))
}

enum Input {
    Value(String),
    Keep,
    Back,
    Quit,
}

fn ask(label: &str) -> anyhow::Result<Input> {
    Ok(match prompt(label)? {
        None => Input::Quit,
        Some(line) if line == QUIT => Input::Quit,
        Some(line) if line == BACK => Input::Back,
        Some(line) if line.is_empty() => Input::Keep,
        Some(line) => Input::Value(line),
    })
}

fn run_survey(config: &Config, client: &ApiClient) -> anyhow::Result<()> {
    let store = FileStore::open(&config.state_dir).context(format!(
        "failed to open state directory {}",
        config.state_dir.display()
    ))?;
    let mut wizard = SurveyWizard::new(store);

    println!(
        "Enter keeps the current answer, '{}' goes back a step, '{}' saves and quits.\n",
        BACK, QUIT
    );

    loop {
        let section = wizard.current_section();
        println!(
            "{BOLD}[{}/{}] {}{RESET} ({}%)",
            wizard.active_step() + 1,
            SECTIONS.len(),
            section.label,
            wizard.progress(section.key)
        );

        let mut back = false;
        if section.is_personal_info() {
            for field in PersonalField::REQUIRED {
                let current = field.value(&wizard.state().personal).to_string();
                loop {
                    match ask(&format!("{} [{}]:", field.label(), current))? {
                        Input::Value(value) => {
                            wizard.set_personal_field(field, &value)?;
                            break;
                        }
                        Input::Keep => break,
                        Input::Back => {
                            back = true;
                            break;
                        }
                        Input::Quit if leave_survey(&wizard)? => return Ok(()),
                        Input::Quit => {}
                    }
                }
                if back {
                    break;
                }
            }
        } else {
            for (index, question) in section.questions.iter().enumerate() {
                let ordinal = index + 1;
                let (options, current) = if section.is_social_media_item(ordinal) {
                    let hours = &wizard.state().personal.social_media_hours;
                    (&SOCIAL_MEDIA_OPTIONS, hours.clone())
                } else {
                    let answer = wizard.answer(section.key, ordinal).unwrap_or_default();
                    (&LIKERT_OPTIONS, answer.to_string())
                };

                println!("  {}. {}", ordinal, question);
                let choices: Vec<String> = options
                    .iter()
                    .map(|(value, label)| format!("{}={}", value, label))
                    .collect();
                println!("     {}", choices.join(", "));

                loop {
                    match ask(&format!("     [{}]:", current))? {
                        Input::Value(value) => {
                            match wizard.set_answer(section.key, ordinal, &value) {
                                Ok(()) => break,
                                Err(e) => eprintln!("     {}", e),
                            }
                        }
                        Input::Keep => break,
                        Input::Back => {
                            back = true;
                            break;
                        }
                        Input::Quit if leave_survey(&wizard)? => return Ok(()),
                        Input::Quit => {}
                    }
                }
                if back {
                    break;
                }
            }
        }

        if back {
            wizard.retreat();
            continue;
        }

        match wizard.advance() {
            StepOutcome::Moved { .. } => println!(),
            StepOutcome::Stayed if !wizard.errors().is_empty() => {
                for (key, message) in wizard.errors() {
                    eprintln!("  {}: {}", key, message);
                }
            }
            StepOutcome::Stayed => break,
        }
    }

    let submitted = wizard.submit(client);
    match wizard.submit_status() {
        Some(SubmitStatus::Success(message)) => println!("{BOLD}{}{RESET}", message),
        Some(SubmitStatus::Error(message)) => eprintln!("{}", message),
        None => {}
    }
    submitted.context("survey was not submitted, answers are kept for the next run")?;

    println!("Next, upload your grade file with `humg upload <file.xlsx>`.");
    Ok(())
}

/// Asks before abandoning a survey that is under way. Answers stay saved
/// either way.
fn leave_survey<S: KeyValueStore>(wizard: &SurveyWizard<S>) -> anyhow::Result<bool> {
    if !wizard.should_confirm_leave() {
        return Ok(true);
    }
    match prompt("Khảo sát chưa được gửi. Bạn có chắc muốn thoát? [y/N]")? {
        Some(answer) => Ok(is_yes(&answer)),
        None => Ok(true),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "c" | "có")
}

fn run_upload(client: &ApiClient, path: &Path) -> anyhow::Result<()> {
    let file = GradeFile::validate(path)?;
    client.upload_grades(&file)?;

    println!("uploaded {BOLD}{}{RESET} ({} bytes)", file.name, file.size);
    Ok(())
}

/// Prints only the part of each stage's text that is new since the last update.
#[derive(Default)]
struct TokenPrinter {
    printed: BTreeMap<Stage, usize>,
    stage: Option<Stage>,
}

impl TokenPrinter {
    fn show(&mut self, stage: Stage, text: &str) {
        if self.stage != Some(stage) {
            println!("\n\n{BOLD}{}{RESET}", stage.title());
            self.stage = Some(stage);
        }
        let printed = self.printed.entry(stage).or_insert(0);
        if let Some(fresh) = text.get(*printed..) {
            print!("{}", fresh);
            *printed = text.len();
        }
        io::stdout().flush().ok();
    }
}

fn run_analyze(client: &ApiClient) -> anyhow::Result<()> {
    let mut page = AnalysisPage::new();
    let mut printer = TokenPrinter::default();

    page.start_analysis(client, |analysis| {
        if let Some(stage) = analysis.current_stage() {
            printer.show(stage, analysis.accumulated(stage));
        }
        Flow::Continue
    });
    println!();

    if let Some(error) = page.analysis().error() {
        anyhow::bail!("analysis did not finish: {}", error);
    }

    println!("\n{BOLD}Chat{RESET} (ask about your results, '{}' to quit)", QUIT);
    loop {
        let message = match ask(">")? {
            Input::Value(message) => message,
            Input::Keep | Input::Back => continue,
            Input::Quit => break,
        };

        // (transcript index, bytes of it already printed)
        let mut printed = (0, 0);
        let sent = page.send_chat(client, &message, |chat| {
            let transcript = chat.transcript();
            if let Some(last) = transcript.last().filter(|m| m.role == Role::Assistant) {
                let index = transcript.len() - 1;
                if printed.0 != index {
                    if printed.1 > 0 {
                        println!();
                    }
                    printed = (index, 0);
                }
                if let Some(fresh) = last.content.get(printed.1..) {
                    print!("{}", fresh);
                    printed.1 = last.content.len();
                }
                io::stdout().flush().ok();
            }
            Flow::Continue
        });
        match sent {
            Ok(()) => println!("\n"),
            Err(ChatRejected::Empty) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    page.leave();
    Ok(())
}

fn run_summary(client: &ApiClient) -> anyhow::Result<()> {
    let skills = client.skill_summary()?;
    println!("{BOLD}Kỹ năng học tập{RESET}");
    if let Some(submitted_at) = &skills.submitted_at {
        println!("(khảo sát nộp lúc {})", submitted_at);
    }
    for (label, percentage) in skills.chart_points() {
        println!("  {:<40} {:>6.1}%", label, percentage);
    }

    let grades = client.grade_report()?;
    println!("\n{BOLD}Điểm trung bình hệ 4{RESET}");
    for point in grades.gpa_series() {
        match point.cumulative_gpa4 {
            Some(cumulative) => println!(
                "  {:<40} {:>5.2} (tích lũy {:.2})",
                point.semester, point.gpa4, cumulative
            ),
            None => println!("  {:<40} {:>5.2}", point.semester, point.gpa4),
        }
    }

    println!("\n{BOLD}Phân bố điểm chữ{RESET}");
    for (grade, count) in grades.letter_grade_distribution() {
        println!("  {:<4} {}", grade, count);
    }

    Ok(())
}
